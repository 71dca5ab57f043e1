use llvm_ops::asm::{PrinterConfig, print_module};
use llvm_ops::check::{VerificationError, verify_module};
use llvm_ops::codegen::{LoweringError, RecordingHost, lower_module};
use llvm_ops::ir::Module;
use llvm_ops::parser::parse_module;

/// Parses `source`, failing the test with the parse error otherwise.
pub fn parse(source: &str) -> Module {
    match parse_module(source) {
        Ok(module) => module,
        Err(error) => panic!("failed to parse at {:?}: {error}\n{source}", error.span),
    }
}

/// Parses and verifies `source`, returning the verification error if any.
#[allow(unused)]
pub fn verify(source: &str) -> Result<Module, VerificationError> {
    let module = parse(source);
    verify_module(&module)?;
    Ok(module)
}

/// Prints a module with the default printer settings.
#[allow(unused)]
pub fn print(module: &Module) -> String {
    print_module(module, &PrinterConfig::default())
}

#[allow(unused)]
pub fn renumbered(module: &Module) -> String {
    let config = PrinterConfig {
        renumber: true,
        ..PrinterConfig::default()
    };
    print_module(module, &config)
}

/// Parses, verifies and lowers `source` into a fresh recording host.
#[allow(unused)]
pub fn lower(source: &str) -> Result<RecordingHost, LoweringError> {
    let module = parse(source);
    let verified = match verify_module(&module) {
        Ok(verified) => verified,
        Err(error) => panic!("failed to verify: {error}\n{source}"),
    };
    let mut host = RecordingHost::new();
    lower_module(&verified, &mut host)?;
    Ok(host)
}
