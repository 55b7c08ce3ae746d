use anyhow::Result;
use console::style;

/// The standalone binary has no cross-process channel to a running `run`
/// invocation; that session is stopped with Ctrl-C instead. This subcommand
/// exists for parity with the event contract when the core is embedded in a
/// process that already holds the `EventBus` (e.g. a GUI shell).
pub async fn run() -> Result<()> {
    println!(
        "{}",
        style("No in-process session to signal from a standalone invocation.").yellow()
    );
    println!("Press Ctrl-C in the terminal running `translorc run` to stop it gracefully.");
    Ok(())
}
