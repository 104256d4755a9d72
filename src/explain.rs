//! Human-readable and JSON summaries of a [`JoinPlan`].

use crate::assembler::{JoinPlan, PlannedFile};
use crate::mapper::MapStats;
use serde_json::{Value, json};
use std::fmt::{Display, Formatter, Result as FormatResult};

/// Mapping summary for one planned file.
#[derive(Debug, Clone)]
pub struct FileExplanation {
    pub name: String,
    pub stats: MapStats,
    /// Parts listed per worker, by worker index.
    pub parts_per_worker: Vec<usize>,
    pub remote_routing: bool,
}

/// Detailed explanation of a join plan.
#[derive(Debug, Clone)]
pub struct PlanExplanation {
    pub index_name: String,
    pub group_size: usize,
    pub local: bool,
    pub total_index_parts: usize,
    pub super_width: usize,
    pub key_has_tlk: bool,
    pub top_level_key_bytes: usize,
    pub index: Option<FileExplanation>,
    pub data: Option<FileExplanation>,
    pub warnings: Vec<String>,
}

fn explain_file(file: &PlannedFile, remote_routing: bool) -> FileExplanation {
    let map = file.map();
    FileExplanation {
        name: file.name().to_string(),
        stats: map.stats(),
        parts_per_worker: (0..map.worker_count())
            .map(|w| map.worker_parts(w).len())
            .collect(),
        remote_routing,
    }
}

fn stats_value(file: &FileExplanation) -> Value {
    json!({
        "name": file.name,
        "total_parts": file.stats.total_parts,
        "mapped_parts": file.stats.mapped_parts,
        "unmapped_parts": file.stats.unmapped_parts,
        "workers_with_parts": file.stats.workers_with_parts,
        "worker_entries": file.stats.worker_entries,
        "remote_routing": file.remote_routing,
    })
}

impl JoinPlan {
    /// Summarize the plan: routing decisions, super-key shape and per-file mapping counts.
    #[must_use]
    pub fn explain(&self) -> PlanExplanation {
        let header = self.header();
        PlanExplanation {
            index_name: header.index_name.clone(),
            group_size: self.group_size(),
            local: self.is_local(),
            total_index_parts: header.total_index_parts,
            super_width: header.super_width,
            key_has_tlk: header.key_has_tlk,
            top_level_key_bytes: header.top_level_keys.iter().map(Vec::len).sum(),
            index: self
                .index()
                .map(|f| explain_file(f, header.remote_keyed_lookup)),
            data: self
                .data()
                .map(|f| explain_file(f, header.remote_keyed_fetch)),
            warnings: self.warnings().iter().map(ToString::to_string).collect(),
        }
    }

    /// Mapping statistics as JSON, keyed by `index` and `data`.
    #[must_use]
    pub fn stats_json(&self) -> Value {
        let explanation = self.explain();
        json!({
            "index_name": explanation.index_name,
            "group_size": explanation.group_size,
            "local": explanation.local,
            "total_index_parts": explanation.total_index_parts,
            "index": explanation.index.as_ref().map(stats_value),
            "data": explanation.data.as_ref().map(stats_value),
            "warnings": explanation.warnings,
        })
    }
}

fn write_file(f: &mut Formatter<'_>, title: &str, file: &FileExplanation) -> FormatResult {
    writeln!(
        f,
        "┌─ {title} ─────────────────────────────────────────────────────┐"
    )?;
    writeln!(f, "│ File:              {}", file.name)?;
    writeln!(f, "│ Parts:             {:>10}", file.stats.total_parts)?;
    writeln!(f, "│ Mapped:            {:>10}", file.stats.mapped_parts)?;
    writeln!(f, "│ Broadcast:         {:>10}", file.stats.unmapped_parts)?;
    writeln!(f, "│ Workers w/ parts:  {:>10}", file.stats.workers_with_parts)?;
    writeln!(
        f,
        "│ Remote routing:    {:>10}",
        if file.remote_routing { "enabled" } else { "disabled" }
    )?;
    writeln!(f, "│")?;
    for (worker, count) in file.parts_per_worker.iter().enumerate() {
        writeln!(f, "│   worker {worker:>4}: {count} part(s)")?;
    }
    writeln!(
        f,
        "└──────────────────────────────────────────────────────────────┘"
    )
}

impl Display for PlanExplanation {
    fn fmt(&self, f: &mut Formatter<'_>) -> FormatResult {
        writeln!(
            f,
            "╔═══════════════════════════════════════════════════════════════╗"
        )?;
        writeln!(
            f,
            "║              KEYED JOIN DISTRIBUTION PLAN                     ║"
        )?;
        writeln!(
            f,
            "╚═══════════════════════════════════════════════════════════════╝"
        )?;
        writeln!(f)?;

        writeln!(
            f,
            "┌─ SUMMARY ────────────────────────────────────────────────────┐"
        )?;
        writeln!(f, "│ Index:             {}", self.index_name)?;
        writeln!(f, "│ Workers:           {:>10}", self.group_size)?;
        writeln!(f, "│ Index Parts:       {:>10}", self.total_index_parts)?;
        writeln!(
            f,
            "│ Mode:              {:>10}",
            if self.local { "local" } else { "distributed" }
        )?;
        if self.super_width > 0 {
            writeln!(f, "│ Super Width:       {:>10}", self.super_width)?;
        }
        if self.key_has_tlk {
            writeln!(f, "│ TLK Bytes:         {:>10}", self.top_level_key_bytes)?;
        }
        writeln!(
            f,
            "└──────────────────────────────────────────────────────────────┘"
        )?;

        if let Some(index) = &self.index {
            writeln!(f)?;
            write_file(f, "INDEX", index)?;
        }
        if let Some(data) = &self.data {
            writeln!(f)?;
            write_file(f, "DATA", data)?;
        }

        if !self.warnings.is_empty() {
            writeln!(f)?;
            writeln!(
                f,
                "┌─ WARNINGS ───────────────────────────────────────────────────┐"
            )?;
            for warning in &self.warnings {
                writeln!(f, "│ • {warning}")?;
            }
            writeln!(
                f,
                "└──────────────────────────────────────────────────────────────┘"
            )?;
        }
        Ok(())
    }
}
