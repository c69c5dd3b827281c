//! `modelinfo` module: model inventory discovery plus capability and cost
//! lookups computed over the provider's inventory.
//!
//! An inventory is an object with a `models` array; each model is an object
//! with `name`, `capabilities` and optionally `pricing`.

use super::{AdapterSpec, Binding, ConstantGroup, Layout, Namespace};
use crate::error::{BridgeError, BridgeResult};
use crate::lua::arg::{STR, TABLE};
use crate::lua::Returns;
use crate::value::{ObjectMap, TaggedValue};

const INVENTORY: &str = "fetchModelInventory";

pub static MODELINFO: AdapterSpec = AdapterSpec {
    name: "modelinfo",
    version: "1.0.0",
    layout: Layout::Nested,
    bridge_methods: true,
    namespaces: &[
        Namespace {
            name: "discovery",
            bindings: &[
                Binding::table("listModels", "listModels", &[]),
                Binding::table("fetchInventory", INVENTORY, &[]),
            ],
            constants: &[],
        },
        Namespace {
            name: "capabilities",
            bindings: &[
                Binding::view("getModelCapabilities", INVENTORY, &[STR], model_capabilities)
                    .returning(Returns::Table),
                Binding::view("findModelsByCapability", INVENTORY, &[STR], models_with_capability)
                    .returning(Returns::Table),
            ],
            constants: &[
                ("TEXT_READ", "text.read"),
                ("TEXT_WRITE", "text.write"),
                ("IMAGE_READ", "image.read"),
                ("IMAGE_WRITE", "image.write"),
                ("AUDIO_READ", "audio.read"),
                ("AUDIO_WRITE", "audio.write"),
                ("VIDEO_READ", "video.read"),
                ("VIDEO_WRITE", "video.write"),
                ("FILE_READ", "file.read"),
                ("FILE_WRITE", "file.write"),
                ("FUNCTION_CALLING", "functionCalling"),
                ("STREAMING", "streaming"),
            ],
        },
        Namespace {
            name: "selection",
            bindings: &[Binding::view("estimateCost", INVENTORY, &[STR, TABLE], estimate_cost).returning(Returns::Table)],
            constants: &[],
        },
    ],
    root: &[],
    constants: &[
        ConstantGroup {
            name: "PRIORITIES",
            entries: &[
                ("COST", "cost"),
                ("PERFORMANCE", "performance"),
                ("CONTEXT_WINDOW", "context_window"),
                ("CAPABILITY", "capability"),
            ],
        },
        ConstantGroup {
            name: "TASKS",
            entries: &[
                ("FUNCTION_CALLING", "function_calling"),
                ("TEXT_GENERATION", "text_generation"),
                ("CODE_GENERATION", "code_generation"),
                ("ANALYSIS", "analysis"),
            ],
        },
    ],
    extend: None,
};

fn models(inventory: &TaggedValue) -> BridgeResult<&[TaggedValue]> {
    let fields = inventory
        .as_object()
        .ok_or_else(|| BridgeError::provider("invalid inventory format"))?;
    fields
        .get("models")
        .and_then(TaggedValue::as_array)
        .ok_or_else(|| BridgeError::provider("no models in inventory"))
}

fn find_model<'a>(models: &'a [TaggedValue], name: &str) -> Option<&'a TaggedValue> {
    models
        .iter()
        .find(|model| model.get("name").and_then(TaggedValue::as_str) == Some(name))
}

/// Numbers pass string argument checks, so they are read as their text
fn string_arg(args: &[TaggedValue], index: usize) -> String {
    match args.get(index) {
        Some(TaggedValue::String(s)) => s.clone(),
        Some(TaggedValue::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

/// `"text.read"` looks inside the `text` category; other names are top-level flags
fn has_capability(capabilities: &ObjectMap, capability: &str) -> bool {
    let flag = match capability.split_once('.') {
        Some((_, field)) if field.contains('.') => return false,
        Some((category, field)) => capabilities.get(category).and_then(|c| c.get(field)),
        None => capabilities.get(capability),
    };
    flag.and_then(TaggedValue::as_bool).unwrap_or(false)
}

fn model_capabilities(args: &[TaggedValue], inventory: TaggedValue) -> BridgeResult<TaggedValue> {
    let name = string_arg(args, 0);
    let model = find_model(models(&inventory)?, &name)
        .ok_or_else(|| BridgeError::provider(format!("model not found: {}", name)))?;
    model
        .get("capabilities")
        .cloned()
        .ok_or_else(|| BridgeError::provider("model has no capabilities"))
}

fn models_with_capability(args: &[TaggedValue], inventory: TaggedValue) -> BridgeResult<TaggedValue> {
    let capability = string_arg(args, 0);
    let matching = models(&inventory)?
        .iter()
        .filter(|model| {
            model
                .get("capabilities")
                .and_then(TaggedValue::as_object)
                .map_or(false, |caps| has_capability(caps, &capability))
        })
        .cloned()
        .collect();
    Ok(TaggedValue::Array(matching))
}

fn estimate_cost(args: &[TaggedValue], inventory: TaggedValue) -> BridgeResult<TaggedValue> {
    let name = string_arg(args, 0);
    let tokens = |key: &str| {
        args.get(1)
            .and_then(|usage| usage.get(key))
            .and_then(TaggedValue::as_f64)
            .unwrap_or(0.0)
    };
    let (input_tokens, output_tokens) = (tokens("inputTokens"), tokens("outputTokens"));

    let model = find_model(models(&inventory)?, &name)
        .ok_or_else(|| BridgeError::provider(format!("model not found: {}", name)))?;
    let pricing = model
        .get("pricing")
        .and_then(TaggedValue::as_object)
        .ok_or_else(|| BridgeError::provider(format!("model {} has no pricing information", name)))?;
    let price = |key: &str| pricing.get(key).and_then(TaggedValue::as_f64).unwrap_or(0.0);

    let input_cost = input_tokens / 1000.0 * price("inputPer1kTokens");
    let output_cost = output_tokens / 1000.0 * price("outputPer1kTokens");
    Ok(TaggedValue::object([
        ("inputCost", input_cost.into()),
        ("outputCost", output_cost.into()),
        ("totalCost", (input_cost + output_cost).into()),
    ]))
}
