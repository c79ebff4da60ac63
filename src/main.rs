use miette::Result;

/// Main entry point for the infraviz CLI tool
fn main() -> Result<()> {
    // Install miette's panic and error handler for readable diagnostics
    miette::set_panic_hook();

    infraviz::run()
}
