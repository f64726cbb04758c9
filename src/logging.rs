use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

/// Installs the global subscriber.
///
/// Logs go to stderr so that `-e` output on stdout stays pipeable. Plain
/// messages at info level; `-d`/`-t` switch to the full format.
pub fn init(debug: bool, trace: bool) {
    let level = if trace {
        LevelFilter::TRACE
    } else if debug {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };
    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if debug || trace {
        builder.with_target(true).init();
    } else {
        builder
            .without_time()
            .with_target(false)
            .with_level(false)
            .init();
    }
}
