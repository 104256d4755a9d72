use partroute::testing::*;
use partroute::*;

#[test]
fn explanation_summarizes_routing_and_mapping() -> Result<()> {
    let topology = cluster(4);
    let mut catalog = striped_index_catalog("orders::idx", 4);
    catalog.insert(FileBuilder::flat("orders").part_on(vec![node(30)]).build());
    let request = JoinRequest::new("orders::idx").with_fetch("orders");
    let plan = JoinPlanAssembler::new(&catalog, &topology, JoinPlanOptions::default())
        .build_plan(&request)?;

    let explanation = plan.explain();
    assert_eq!(explanation.group_size, 4);
    assert_eq!(explanation.total_index_parts, 4);
    assert_eq!(explanation.top_level_key_bytes, tlk_bytes("orders::idx").len());
    let index = explanation.index.as_ref().expect("index explained");
    assert!(index.remote_routing);
    assert_eq!(index.parts_per_worker, vec![1, 1, 1, 1]);
    let data = explanation.data.as_ref().expect("data explained");
    assert!(!data.remote_routing);
    assert_eq!(data.stats.unmapped_parts, 1);

    let text = explanation.to_string();
    assert!(text.contains("KEYED JOIN DISTRIBUTION PLAN"));
    assert!(text.contains("orders::idx"));
    assert!(text.contains("distributed"));
    Ok(())
}

#[test]
fn stats_json_reports_both_files() -> Result<()> {
    let topology = cluster(2);
    let mut catalog = striped_index_catalog("idx", 2);
    catalog.insert(FileBuilder::flat("data").striped(2, 2).build());
    let request = JoinRequest::new("idx")
        .with_fetch(FetchRequest::new("data").with_encryption_key(b"unused".to_vec()));
    let plan = JoinPlanAssembler::new(&catalog, &topology, JoinPlanOptions::default())
        .build_plan(&request)?;

    let stats = plan.stats_json();
    assert_eq!(stats["index_name"], "idx");
    assert_eq!(stats["index"]["total_parts"], 2);
    assert_eq!(stats["index"]["mapped_parts"], 2);
    assert_eq!(stats["data"]["workers_with_parts"], 2);
    assert_eq!(stats["data"]["remote_routing"], true);
    assert_eq!(stats["warnings"].as_array().map(Vec::len), Some(1));
    Ok(())
}
