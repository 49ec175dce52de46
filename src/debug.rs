use std::fs::{File, OpenOptions};
use std::io::Write;
use std::sync::Mutex;

use once_cell::sync::OnceCell;

pub const DEBUG_ENV: &str = "REEL_FEED_DEBUG";
pub const DEBUG_LOG_ENV: &str = "REEL_FEED_DEBUG_LOG";

pub fn enabled() -> bool {
    static FLAG: OnceCell<bool> = OnceCell::new();
    *FLAG.get_or_init(|| {
        std::env::var(DEBUG_ENV)
            .map(|val| is_truthy(&val))
            .unwrap_or(false)
    })
}

fn is_truthy(raw: &str) -> bool {
    let trimmed = raw.trim();
    !(trimmed.is_empty()
        || trimmed.eq_ignore_ascii_case("0")
        || trimmed.eq_ignore_ascii_case("false")
        || trimmed.eq_ignore_ascii_case("no")
        || trimmed.eq_ignore_ascii_case("off"))
}

fn writer() -> Option<&'static Mutex<File>> {
    static WRITER: OnceCell<Option<Mutex<File>>> = OnceCell::new();
    WRITER
        .get_or_init(|| {
            std::env::var(DEBUG_LOG_ENV).ok().and_then(|path| {
                OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)
                    .map(Mutex::new)
                    .ok()
            })
        })
        .as_ref()
}

/// Writes one line to the debug log when `REEL_FEED_DEBUG` is set.
///
/// Goes to the file named by `REEL_FEED_DEBUG_LOG` if it can be opened,
/// otherwise to stderr.
pub fn log(message: impl AsRef<str>) {
    if !enabled() {
        return;
    }
    if let Some(writer) = writer() {
        if let Ok(mut file) = writer.lock() {
            let _ = writeln!(file, "{}", message.as_ref());
            return;
        }
    }
    eprintln!("{}", message.as_ref());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truthy_values() {
        assert!(is_truthy("1"));
        assert!(is_truthy("yes"));
        assert!(is_truthy(" TRUE "));
        assert!(!is_truthy(""));
        assert!(!is_truthy("off"));
        assert!(!is_truthy("False"));
    }
}
