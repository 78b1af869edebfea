use std::io::Write;

use env_logger::{Builder, Env};

/// Sends log records to stderr with a millisecond timestamp.
///
/// The level defaults to `warn` and follows `RUST_LOG` when it is set.
/// Calling it twice is harmless.
pub fn init() {
    let mut builder = Builder::from_env(Env::default().default_filter_or("warn"));
    builder.format(|buf, record| {
        let t = chrono::Local::now();
        writeln!(
            buf,
            "{} {:<5} {}",
            t.format("%Y-%m-%d %H:%M:%S%.3f"),
            record.level(),
            record.args()
        )
    });
    let _ = builder.try_init();
}
