//! `normalize`, `diff`, and `plan`: the reconcile pipeline run offline.

use std::path::Path;

use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use onboard_core::normalize::classes::is_singleton;
use onboard_core::{
    ApplierKind, ChangeSet, ConfigTree, DeclarationParser, DefaultParser, DiffEntry, DiffKind,
    ExecutionPlan, Normalizer, diff,
};

use crate::cli::{GlobalOpts, StateArgs};
use crate::commands::engine_config;
use crate::error::CliError;
use crate::output;

// ── Input loading ───────────────────────────────────────────────────

fn read_json(path: &Path) -> Result<Value, CliError> {
    let text = std::fs::read_to_string(path).map_err(|source| CliError::FileNotFound {
        path: path.display().to_string(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| CliError::InvalidJson {
        path: path.display().to_string(),
        source,
    })
}

fn read_state(path: &Path) -> Result<ConfigTree, CliError> {
    let value = read_json(path)?;
    serde_json::from_value(value).map_err(|source| CliError::InvalidState {
        path: path.display().to_string(),
        source,
    })
}

/// Resolved inputs for one offline run.
struct Resolved {
    effective: ConfigTree,
    current: ConfigTree,
}

fn resolve(args: &StateArgs, global: &GlobalOpts) -> Result<Resolved, CliError> {
    let raw = read_json(&args.declaration)?;
    let current = args.current.as_deref().map(read_state).transpose()?;
    let original = args.original.as_deref().map(read_state).transpose()?;
    let (current, original) = match (current, original) {
        (Some(c), Some(o)) => (c, o),
        (Some(c), None) => (c.clone(), c),
        (None, Some(o)) => (o.clone(), o),
        (None, None) => (ConfigTree::new(), ConfigTree::new()),
    };

    let normalizer = Normalizer::new(&engine_config(global)?);
    let parsed = DefaultParser.parse(&raw)?;
    let effective = normalizer.normalize(&parsed, &current, &original)?;
    debug!(tenants = effective.len(), "declaration normalized");

    Ok(Resolved {
        effective,
        current: normalizer.canonical_state(&current),
    })
}

// ── Handlers ────────────────────────────────────────────────────────

pub fn normalize(args: &StateArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let resolved = resolve(args, global)?;
    let out = output::render(global.output, &resolved.effective, object_lines)?;
    output::print_output(&out, global.quiet);
    Ok(())
}

pub fn diff_cmd(args: &StateArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let resolved = resolve(args, global)?;
    let change_set = diff(&resolved.effective, &resolved.current);
    let out = output::render(global.output, &change_set, |cs: &ChangeSet| {
        cs.trace.iter().map(trace_line).collect()
    })?;
    output::print_output(&out, global.quiet);
    Ok(())
}

#[derive(Debug, Serialize)]
struct StepView<'a> {
    applier: ApplierKind,
    objects: usize,
    slice: &'a ConfigTree,
}

pub fn plan(args: &StateArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let resolved = resolve(args, global)?;
    let change_set = diff(&resolved.effective, &resolved.current);
    let plan = ExecutionPlan::build(&change_set, &resolved.current);

    let steps: Vec<StepView<'_>> = plan
        .steps
        .iter()
        .map(|step| StepView {
            applier: step.kind,
            objects: count_objects(&step.slice),
            slice: &step.slice,
        })
        .collect();
    let out = output::render(global.output, &steps, |steps: &Vec<StepView<'_>>| {
        steps
            .iter()
            .map(|s| format!("{}\t{}", s.applier, s.objects))
            .collect()
    })?;
    output::print_output(&out, global.quiet);
    Ok(())
}

// ── Plain views ─────────────────────────────────────────────────────

/// `tenant/class` for singletons, `tenant/class/object` otherwise.
fn object_lines(tree: &ConfigTree) -> Vec<String> {
    let mut lines = Vec::new();
    for (tenant, classes) in tree {
        for (class, body) in classes {
            match body.as_object() {
                Some(objects) if !is_singleton(class) => {
                    lines.extend(objects.keys().map(|name| format!("{tenant}/{class}/{name}")));
                }
                _ => lines.push(format!("{tenant}/{class}")),
            }
        }
    }
    lines
}

fn count_objects(tree: &ConfigTree) -> usize {
    object_lines(tree).len()
}

fn trace_line(entry: &DiffEntry) -> String {
    let kind = match entry.kind {
        DiffKind::New => "N",
        DiffKind::Deleted => "D",
        DiffKind::Edited => "E",
        DiffKind::Array => "A",
    };
    format!("{kind} /{}", entry.path.join("/"))
}
