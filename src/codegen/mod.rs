//! Lowering of verified modules into a host IR builder.

use std::thread;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::catalog::OpCode;
use crate::check::VerifiedModule;
use crate::ir::{Module, Operation};

mod compiler;
mod context;
pub mod errors;
pub mod host;
#[cfg(feature = "mlir")]
pub mod mlir;
pub mod recording;

pub use errors::{HostError, LoweringError, LoweringErrorKind};
pub use host::{
    BinaryOp, CastOp, Callee, FunctionDecl, GlobalDecl, HostBuilder, HostResult, MemoryAccess,
    Target,
};
pub use recording::RecordingHost;

/// Settings of the `[lowering]` config table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoweringConfig {
    /// Threads used to lower function bodies. `1` lowers on the calling thread.
    pub jobs: usize,
}

impl Default for LoweringConfig {
    fn default() -> Self {
        Self { jobs: 1 }
    }
}

fn declare_global<H: HostBuilder>(op: &Operation, host: &mut H) -> Result<(), LoweringError> {
    let name = op.symbol_name().unwrap_or_default();
    let error = |kind: LoweringErrorKind| LoweringError {
        function: name.to_string(),
        op: op.name(),
        span: op.span,
        kind,
    };
    let decl = compiler::global_decl(op)
        .ok_or_else(|| error(LoweringErrorKind::Attribute("global_type")))?;
    host.declare_global(&decl).map_err(|e| error(e.into()))
}

/// Lowers a verified module into `host`: every global first, then every
/// function in module order.
///
/// Stops at the first function that fails to lower. Functions lowered before
/// it stay in the host, the failing one is discarded.
#[instrument(level = "debug", skip_all)]
pub fn lower_module<H: HostBuilder>(
    verified: &VerifiedModule<'_>,
    host: &mut H,
) -> Result<(), LoweringError> {
    let module = verified.module();
    for op in module.globals() {
        declare_global(op, host)?;
    }
    for op in module.functions() {
        compiler::lower_function(module, op, host)?;
    }
    info!("lowered {} functions", module.functions().count());
    Ok(())
}

/// Lowers each function of the module into a private host made by `make_host`,
/// using up to `jobs` scoped threads.
///
/// Each host receives every global and every function declaration first, so
/// symbol references resolve inside it, then the one function body it owns.
/// Results come back in module order, paired with the function name.
#[instrument(level = "debug", skip(verified, make_host))]
pub fn lower_functions_concurrently<H, F>(
    verified: &VerifiedModule<'_>,
    jobs: usize,
    make_host: F,
) -> Vec<(String, Result<H, LoweringError>)>
where
    H: HostBuilder + Send,
    F: Fn() -> H + Sync,
{
    let module = verified.module();
    let definitions = module
        .functions()
        .filter(|x| compiler::function_body(x).is_some())
        .collect::<Vec<_>>();
    let chunk = definitions.len().div_ceil(jobs.max(1)).max(1);
    debug!(
        "lowering {} definitions in chunks of {}",
        definitions.len(),
        chunk
    );

    let lower_one = |op: &Operation| -> Result<H, LoweringError> {
        let mut host = make_host();
        declare_prelude(module, op, &mut host)?;
        compiler::lower_function(module, op, &mut host)?;
        Ok(host)
    };

    thread::scope(|scope| {
        let handles = definitions
            .chunks(chunk)
            .map(|ops| {
                let lower_one = &lower_one;
                let handle =
                    scope.spawn(move || ops.iter().map(|&op| lower_one(op)).collect::<Vec<_>>());
                (ops, handle)
            })
            .collect::<Vec<_>>();

        let mut results = Vec::with_capacity(definitions.len());
        for (ops, handle) in handles {
            let names = ops.iter().map(|x| x.symbol_name().unwrap_or_default().to_string());
            match handle.join() {
                Ok(lowered) => results.extend(names.zip(lowered)),
                Err(_) => {
                    warn!("a lowering thread panicked");
                    results.extend(names.zip(ops.iter()).map(|(name, op)| {
                        let error = LoweringError {
                            function: name.clone(),
                            op: op.name(),
                            span: op.span,
                            kind: LoweringErrorKind::Panicked,
                        };
                        (name, Err(error))
                    }))
                }
            }
        }
        results
    })
}

/// Globals and the declarations of every function but `skip`.
fn declare_prelude<H: HostBuilder>(
    module: &Module,
    skip: &Operation,
    host: &mut H,
) -> Result<(), LoweringError> {
    for op in &module.body {
        if std::ptr::eq(op, skip) {
            continue;
        }
        match op.opcode {
            OpCode::Global => declare_global(op, host)?,
            OpCode::Func => {
                if let Some(decl) = compiler::function_decl(op) {
                    host.declare_function(&decl).map_err(|e| LoweringError {
                        function: decl.name.to_string(),
                        op: op.name(),
                        span: op.span,
                        kind: e.into(),
                    })?;
                }
            }
            _ => {}
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::check::verify_module;
    use crate::parser::parse_module;

    const SOURCE: &str = "llvm.global internal constant @answer(42 : i32) : i32
llvm.func @puts(ptr<i8>) -> i32
llvm.func @load() -> i32 {
  %p = llvm.mlir.addressof @answer : ptr<i32>
  %v = llvm.load %p : ptr<i32>
  llvm.return %v : i32
}
llvm.func @twice(%x: i32) -> i32 {
  %0 = llvm.add %x, %x : i32
  llvm.return %0 : i32
}
";

    #[test]
    fn declares_globals_then_functions() {
        let module = parse_module(SOURCE).unwrap();
        let verified = verify_module(&module).unwrap();
        let mut host = RecordingHost::new();
        lower_module(&verified, &mut host).unwrap();

        assert_eq!(host.globals().len(), 1);
        let names = host.functions().iter().map(|x| x.name.as_str()).collect::<Vec<_>>();
        assert_eq!(names, ["puts", "load", "twice"]);
        assert!(host.function("puts").unwrap().is_declaration());
        assert_eq!(host.count("load"), 1);
        assert_eq!(host.count("add"), 1);
    }

    #[test]
    fn concurrent_lowering_keeps_module_order() {
        let module = parse_module(SOURCE).unwrap();
        let verified = verify_module(&module).unwrap();
        let lowered = lower_functions_concurrently(&verified, 4, RecordingHost::new);

        let names = lowered.iter().map(|x| x.0.as_str()).collect::<Vec<_>>();
        assert_eq!(names, ["load", "twice"]);
        for (name, host) in lowered {
            let host = host.unwrap();
            assert_eq!(host.globals().len(), 1);
            assert!(!host.function(&name).unwrap().is_declaration());
        }
    }

    #[test]
    fn config_defaults_to_one_job() {
        let config: LoweringConfig = toml::from_str("").unwrap();
        assert_eq!(config.jobs, 1);
    }
}
