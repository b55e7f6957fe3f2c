use crate::builtins::cidr::{check_arguments, ip_belongs_to_network};
use rhai::{Dynamic, EvalAltResult, Module};
use serde::Serialize;
use tracing::debug;

/// Default upper bound on operations per evaluation.
pub const DEFAULT_MAX_OPERATIONS: u64 = 100_000;
/// Default maximum nesting depth of an expression.
pub const DEFAULT_MAX_EXPR_DEPTH: usize = 64;

/// Namespace the builtins are registered under, e.g. `example::ip_belongs_to_network(..)`.
pub const NAMESPACE: &str = "example";

/// A builtin exposed to expressions.
#[derive(Debug, Serialize)]
pub struct FunctionInfo {
    pub name: &'static str,
    pub params: &'static [&'static str],
    pub description: &'static str,
}

impl FunctionInfo {
    pub fn signature(&self) -> String {
        format!("{}::{}({})", NAMESPACE, self.name, self.params.join(", "))
    }
}

static FUNCTIONS: [FunctionInfo; 1] = [FunctionInfo {
    name: "ip_belongs_to_network",
    params: &["ip", "network"],
    description: "returns true if the given IP belongs to the specified CIDR network.",
}];

/// Builtins registered by [`Engine::register`].
pub fn functions() -> &'static [FunctionInfo] {
    &FUNCTIONS
}

// `()` is the host's null; other non-string values are parsed from their text form.
fn argument(value: Dynamic) -> Option<String> {
    if value.is_unit() {
        None
    } else if value.is_string() {
        value.into_string().ok()
    } else {
        Some(value.to_string())
    }
}

fn host_ip_belongs_to_network(ip: Dynamic, network: Dynamic) -> Result<bool, Box<EvalAltResult>> {
    let ip = argument(ip);
    let network = argument(network);
    check_arguments(ip.as_deref(), network.as_deref())
        .and_then(|(ip, network)| ip_belongs_to_network(ip, network))
        .map_err(|e| {
            debug!(error = %e, kind = ?e.kind(), "builtin call failed");
            e.to_string().into()
        })
}

/// Text of an evaluation error as the host reports it.
///
/// Errors raised by a builtin are shown as their own message, without the
/// `Runtime error` label rhai puts in front of them.
pub fn error_message(err: &EvalAltResult) -> String {
    match err {
        EvalAltResult::ErrorRuntime(payload, _) => payload.to_string(),
        EvalAltResult::ErrorInFunctionCall(_, _, inner, _) => error_message(inner),
        _ => err.to_string(),
    }
}

#[derive(Clone, Debug)]
pub struct Engine {
    /// Upper bound on operations per evaluation, 0 for no limit.
    pub max_operations: u64,
    pub max_expr_depth: usize,
}

impl Default for Engine {
    fn default() -> Self {
        Self {
            max_operations: DEFAULT_MAX_OPERATIONS,
            max_expr_depth: DEFAULT_MAX_EXPR_DEPTH,
        }
    }
}

impl Engine {
    pub fn new(max_operations: u64, max_expr_depth: usize) -> Self {
        Self {
            max_operations,
            max_expr_depth,
        }
    }

    /// Build a rhai engine with the builtins registered.
    pub fn register(&self) -> rhai::Engine {
        let mut engine = rhai::Engine::new();
        engine.set_max_operations(self.max_operations);
        engine.set_max_expr_depths(self.max_expr_depth, self.max_expr_depth);

        let mut module = Module::new();
        module.set_native_fn("ip_belongs_to_network", host_ip_belongs_to_network);
        engine.register_static_module(NAMESPACE, module.into());

        debug!(
            namespace = NAMESPACE,
            functions = FUNCTIONS.len(),
            "registered builtins"
        );
        engine
    }
}
