//! ComfyUI workflow-graph extraction.
//!
//! A ComfyUI graph maps node ids to `{class_type, inputs}` objects, with
//! node links written as `[source_id, output]` arrays inside inputs. The
//! extractor finds the first `KSampler*` node, lifts its sampling inputs,
//! and resolves the positive/negative links to their text-encoder nodes.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::{Map, Value};

/// One graph node: a required class tag plus free-form inputs.
#[derive(Clone, Debug, Deserialize)]
pub(crate) struct ComfyNode {
    pub class_type: String,
    #[serde(default)]
    pub inputs: Map<String, Value>,
}

type Graph = BTreeMap<String, ComfyNode>;

/// Interpret a JSON value as a graph.
///
/// A value qualifies when at least one of its entries is an object with a
/// string `class_type`; entries that don't deserialize as nodes are
/// dropped (UI-format metadata rides along in the same objects).
fn graph_from_value(value: &Value) -> Option<Graph> {
    let obj = value.as_object()?;
    let mut graph = Graph::new();
    for (id, node) in obj {
        if let Ok(node) = serde_json::from_value::<ComfyNode>(node.clone()) {
            graph.insert(id.clone(), node);
        }
    }
    if graph.is_empty() {
        None
    } else {
        Some(graph)
    }
}

/// Project a UI-format workflow (`{nodes: [{id, ...}, ...]}`) to an
/// id-keyed map so the graph check can run against it.
fn project_workflow_nodes(value: &Value) -> Option<Value> {
    let nodes = value.as_object()?.get("nodes")?.as_array()?;
    let mut map = Map::new();
    for node in nodes {
        let Some(id) = node.get("id").and_then(link_id) else {
            continue;
        };
        map.insert(id, node.clone());
    }
    Some(Value::Object(map))
}

/// Extract generation fields from any ComfyUI graph present in `fields`.
///
/// Looks at `prompt_json`, `workflow_json`, and any other `*_json` value
/// that nests an object-typed `prompt` or `workflow`. The first graph
/// with a sampler wins; its updates are returned for merging.
pub(crate) fn extract_comfy(fields: &BTreeMap<String, Value>) -> Option<BTreeMap<String, Value>> {
    let mut graphs: Vec<Value> = Vec::new();

    if let Some(v) = fields.get("prompt_json") {
        if v.is_object() {
            graphs.push(v.clone());
        }
    }
    if let Some(v) = fields.get("workflow_json") {
        if let Some(projected) = project_workflow_nodes(v) {
            graphs.push(projected);
        }
    }
    for (key, v) in fields {
        if !key.ends_with("_json") {
            continue;
        }
        for inner_key in ["prompt", "workflow"] {
            if let Some(inner) = v.as_object().and_then(|o| o.get(inner_key)) {
                if inner.is_object() {
                    graphs.push(inner.clone());
                }
            }
        }
    }

    for candidate in graphs {
        let Some(graph) = graph_from_value(&candidate) else {
            continue;
        };
        if let Some(updates) = extract_from_graph(&graph) {
            return Some(updates);
        }
    }
    None
}

/// Sampler keys copied verbatim → their normalized field names.
const SAMPLER_INPUTS: [(&str, &str); 6] = [
    ("seed", "seed"),
    ("steps", "steps"),
    ("cfg", "cfg_scale"),
    ("sampler_name", "sampler"),
    ("scheduler", "scheduler"),
    ("denoise", "denoise"),
];

fn extract_from_graph(graph: &Graph) -> Option<BTreeMap<String, Value>> {
    let sampler = graph
        .values()
        .find(|node| node.class_type.starts_with("KSampler"))?;

    let mut updates = BTreeMap::new();
    updates.insert("generator".to_string(), Value::from("ComfyUI"));

    for (input, field) in SAMPLER_INPUTS {
        if let Some(value) = sampler.inputs.get(input) {
            updates.insert(field.to_string(), value.clone());
        }
    }

    for (input, field) in [("positive", "prompt"), ("negative", "negative_prompt")] {
        if let Some(text) = sampler
            .inputs
            .get(input)
            .and_then(|link| resolve_prompt_text(graph, link))
        {
            updates.insert(field.to_string(), Value::from(text));
        }
    }

    // Checkpoint name, when a loader node carries one.
    for node in graph.values() {
        if node.class_type.starts_with("CheckpointLoader") || node.class_type == "UNETLoader" {
            let name = node
                .inputs
                .get("ckpt_name")
                .or_else(|| node.inputs.get("unet_name"))
                .and_then(Value::as_str);
            if let Some(name) = name {
                updates.insert("model".to_string(), Value::from(name));
                break;
            }
        }
    }

    Some(updates)
}

/// Follow a `positive`/`negative` link to its text.
///
/// The link is `[source_id, output]` or a bare id. Text-encoder nodes
/// carry either `inputs.text` or the SDXL pair `text_g`/`text_l`.
fn resolve_prompt_text(graph: &Graph, link: &Value) -> Option<String> {
    let id = match link {
        Value::Array(items) => link_id(items.first()?),
        other => link_id(other),
    }?;
    let node = graph.get(&id)?;

    if let Some(text) = node.inputs.get("text").and_then(Value::as_str) {
        return Some(text.to_string());
    }

    let parts: Vec<&str> = ["text_g", "text_l"]
        .iter()
        .filter_map(|k| node.inputs.get(*k).and_then(Value::as_str))
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join(" "))
    }
}

fn link_id(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
