//! `agent` module: lifecycle, communication, state, events, profiling,
//! workflows and hooks of provider-managed agents.

use super::{AdapterSpec, Binding, ConstantGroup, Layout, Namespace};
use crate::lua::arg::{FUNC, STR, TABLE, TABLE_OR_EMPTY};

const LIFECYCLE: &[Binding] = &[
    Binding::new("create", "createAgent", &[STR, TABLE]),
    Binding::new("createLLM", "createLLMAgent", &[STR, TABLE_OR_EMPTY]),
    Binding::new("list", "listAgents", &[]),
    Binding::new("get", "getAgent", &[STR]),
    Binding::void("remove", "removeAgent", &[STR]),
    Binding::new("getMetrics", "getAgentMetrics", &[STR]),
];

const COMMUNICATION: &[Binding] = &[
    Binding::new("run", "runAgent", &[STR, TABLE]),
    Binding::new("runAsync", "runAgentAsync", &[STR, TABLE]),
    Binding::void("registerTool", "registerAgentTool", &[STR, TABLE]),
    Binding::void("unregisterTool", "unregisterAgentTool", &[STR, STR]),
    Binding::new("listTools", "listAgentTools", &[STR]),
];

const STATE: &[Binding] = &[
    Binding::new("get", "getAgentState", &[STR]),
    Binding::void("set", "setAgentState", &[STR, TABLE]),
    Binding::new("export", "exportAgentState", &[STR]),
    Binding::void("import", "importAgentState", &[STR, TABLE]),
    Binding::new("saveSnapshot", "createAgentSnapshot", &[STR, STR]),
    Binding::void("loadSnapshot", "restoreAgentSnapshot", &[STR, STR]),
    Binding::new("listSnapshots", "listAgentSnapshots", &[STR]),
];

const EVENTS: &[Binding] = &[
    Binding::void("emit", "emitAgentEvent", &[STR, STR, TABLE]),
    Binding::new("subscribe", "subscribeAgentEvent", &[TABLE, FUNC]),
    Binding::void("unsubscribe", "unsubscribeFromEvents", &[STR]),
    Binding::new("startRecording", "startAgentEventRecording", &[STR]),
    Binding::new("stopRecording", "stopAgentEventRecording", &[STR]),
    Binding::new("replay", "replayAgentEvents", &[STR, TABLE]),
];

const PROFILING: &[Binding] = &[
    Binding::new("start", "startAgentProfiling", &[STR]),
    Binding::new("stop", "stopAgentProfiling", &[STR]),
    Binding::new("getMetrics", "getAgentMetrics", &[STR]),
    Binding::new("getReport", "getAgentPerformanceReport", &[STR]),
];

const WORKFLOW: &[Binding] = &[
    Binding::new("create", "createAgentWorkflow", &[STR, TABLE]),
    Binding::new("execute", "executeAgentWorkflow", &[STR, TABLE]),
    Binding::new("addStep", "addAgentWorkflowStep", &[STR, TABLE]),
];

const HOOKS: &[Binding] = &[
    Binding::void("register", "registerAgentHook", &[STR, STR, FUNC]),
    Binding::new("set", "setAgentHook", &[STR, STR, FUNC]),
    Binding::void("unregister", "unregisterAgentHook", &[STR, STR]),
];

const UTILS: &[Binding] = &[Binding::new("validateConfig", "validateAgentConfig", &[TABLE])];

pub static AGENT: AdapterSpec = AdapterSpec {
    name: "agent",
    version: "2.0.0",
    layout: Layout::Nested,
    bridge_methods: true,
    namespaces: &[
        Namespace { name: "lifecycle", bindings: LIFECYCLE, constants: &[] },
        Namespace { name: "communication", bindings: COMMUNICATION, constants: &[] },
        Namespace { name: "state", bindings: STATE, constants: &[] },
        Namespace { name: "events", bindings: EVENTS, constants: &[] },
        Namespace { name: "profiling", bindings: PROFILING, constants: &[] },
        Namespace { name: "workflow", bindings: WORKFLOW, constants: &[] },
        Namespace { name: "hooks", bindings: HOOKS, constants: &[] },
        Namespace { name: "utils", bindings: UTILS, constants: &[] },
    ],
    root: &[
        Binding::new("createAgent", "createAgent", &[TABLE]),
        Binding::new("createLLMAgent", "createLLMAgent", &[STR, TABLE_OR_EMPTY]),
    ],
    constants: &[
        ConstantGroup {
            name: "TYPES",
            entries: &[("BASIC", "basic"), ("LLM", "llm"), ("WORKFLOW", "workflow"), ("CUSTOM", "custom")],
        },
        ConstantGroup {
            name: "STATES",
            entries: &[
                ("IDLE", "idle"),
                ("RUNNING", "running"),
                ("PAUSED", "paused"),
                ("STOPPED", "stopped"),
                ("ERROR", "error"),
            ],
        },
        ConstantGroup {
            name: "EVENT_TYPES",
            entries: &[
                ("CREATED", "agent_created"),
                ("STARTED", "agent_started"),
                ("STOPPED", "agent_stopped"),
                ("ERROR", "agent_error"),
                ("STATE_CHANGED", "agent_state_changed"),
            ],
        },
        ConstantGroup {
            name: "HOOKS",
            entries: &[
                ("BEFORE_RUN", "beforeRun"),
                ("AFTER_RUN", "afterRun"),
                ("PRE_RUN", "pre_run"),
                ("POST_RUN", "post_run"),
                ("PRE_TOOL", "pre_tool"),
                ("POST_TOOL", "post_tool"),
                ("ERROR", "error"),
            ],
        },
        ConstantGroup {
            name: "WORKFLOW_TYPES",
            entries: &[
                ("SEQUENTIAL", "sequential"),
                ("PARALLEL", "parallel"),
                ("CONDITIONAL", "conditional"),
                ("LOOP", "loop"),
            ],
        },
    ],
    extend: None,
};
