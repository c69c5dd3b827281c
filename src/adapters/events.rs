//! `events` module: publish/subscribe bus, filters, recording and replay,
//! aggregation and correlation.

use super::{AdapterSpec, Binding, ConstantGroup, Layout, Namespace};
use crate::lua::arg::{FUNC, STR, TABLE, TABLE_OR_EMPTY};

pub static EVENTS: AdapterSpec = AdapterSpec {
    name: "events",
    version: "2.0.0",
    layout: Layout::Nested,
    bridge_methods: true,
    namespaces: &[
        Namespace {
            name: "bus",
            bindings: &[
                Binding::void("publish", "publishEvent", &[TABLE]),
                Binding::new("subscribe", "subscribe", &[STR, FUNC]),
                Binding::void("unsubscribe", "unsubscribe", &[STR]),
            ],
            constants: &[],
        },
        Namespace {
            name: "filters",
            bindings: &[
                Binding::new("create", "createFilter", &[TABLE]),
                Binding::new("createComposite", "createCompositeFilter", &[TABLE, STR]),
            ],
            constants: &[],
        },
        Namespace {
            name: "recording",
            bindings: &[
                Binding::void("start", "startRecording", &[]),
                Binding::void("stop", "stopRecording", &[]),
                Binding::new("isRecording", "isRecording", &[]),
            ],
            constants: &[],
        },
        Namespace {
            name: "replay",
            bindings: &[
                Binding::void("start", "replayEvents", &[TABLE, TABLE_OR_EMPTY]),
                Binding::void("pause", "pauseReplay", &[]),
                Binding::void("resume", "resumeReplay", &[]),
                Binding::void("stop", "stopReplay", &[]),
            ],
            constants: &[],
        },
        Namespace {
            name: "aggregation",
            bindings: &[
                Binding::new("create", "createAggregator", &[STR, TABLE]),
                Binding::new("getData", "getAggregatedData", &[STR]),
            ],
            constants: &[],
        },
    ],
    root: &[Binding::new("correlateEvents", "correlateEvents", &[TABLE])],
    constants: &[
        ConstantGroup {
            name: "EVENT_TYPES",
            entries: &[
                ("USER_ACTION", "user_action"),
                ("SYSTEM_EVENT", "system_event"),
                ("ERROR_EVENT", "error_event"),
                ("METRIC_EVENT", "metric_event"),
            ],
        },
        ConstantGroup {
            name: "FILTER_TYPES",
            entries: &[("PATTERN", "pattern"), ("TYPE", "type"), ("TIME_RANGE", "time_range")],
        },
        ConstantGroup {
            name: "AGGREGATION_TYPES",
            entries: &[("COUNT", "count"), ("SUM", "sum"), ("AVERAGE", "average"), ("RATE", "rate")],
        },
    ],
    extend: None,
};
