//! Fixed-width text log of simulation results.
//!
//! The header holds the domain name, then X symbols, then U symbols, each
//! padded or truncated to `format_len`. Each row holds the time and values in
//! the same order, formatted like C's `%g`. Columns are joined by the
//! separator and rows end with a newline. Output is buffered until
//! [`ResultsLogger::flush`].

use std::io::{self, Write};

use odesim_core::{Real, State};

use crate::config::LogConfig;

#[derive(Clone, Debug, PartialEq)]
pub struct LogOptions {
    pub separator: String,
    pub format_len: usize,
    pub precision: Option<usize>,
    pub all_states: bool,
}

impl Default for LogOptions {
    fn default() -> Self {
        Self::from(&LogConfig::default())
    }
}

impl From<&LogConfig> for LogOptions {
    fn from(config: &LogConfig) -> Self {
        Self {
            separator: config.separator.clone(),
            format_len: config.format_len,
            precision: config.precision,
            all_states: config.all_states,
        }
    }
}

pub struct ResultsLogger {
    out: Box<dyn Write + Send>,
    options: LogOptions,
    buffer: String,
}

impl ResultsLogger {
    pub fn new<W: Write + Send + 'static>(out: W) -> Self {
        Self {
            out: Box::new(out),
            options: LogOptions::default(),
            buffer: String::new(),
        }
    }

    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }

    pub fn with_options(mut self, options: LogOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &LogOptions {
        &self.options
    }

    pub(crate) fn set_options(&mut self, options: LogOptions) {
        self.options = options;
    }

    /// Text written since the last flush.
    pub fn pending(&self) -> &str {
        &self.buffer
    }

    pub fn header(&mut self, domain: &str, state: &State) {
        let len = self.options.format_len;
        let columns: Vec<String> = std::iter::once(domain)
            .chain(state.x_symbols().iter().map(|s| s.as_str()))
            .chain(state.u_symbols().iter().map(|s| s.as_str()))
            .map(|name| fix_length(name, len))
            .collect();
        self.push_line(&columns);
    }

    pub fn row(&mut self, state: &State) {
        let len = self.options.format_len;
        let precision = self.options.precision;
        let columns: Vec<String> = std::iter::once(state.time())
            .chain(state.x_values().iter().copied())
            .chain(state.u_vector())
            .map(|v| format!("{:>len$}", format_g(v, precision)))
            .collect();
        self.push_line(&columns);
    }

    /// Logs the states appended by one domain step.
    pub fn rows(&mut self, states: &[State]) {
        if self.options.all_states {
            for state in states {
                self.row(state);
            }
        } else if let Some(last) = states.last() {
            self.row(last);
        }
    }

    fn push_line(&mut self, columns: &[String]) {
        self.buffer.push_str(&columns.join(&self.options.separator));
        self.buffer.push('\n');
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.out.write_all(self.buffer.as_bytes())?;
        self.buffer.clear();
        self.out.flush()
    }
}

/// Pads `name` with spaces or truncates it to exactly `len` characters.
pub fn fix_length(name: &str, len: usize) -> String {
    let truncated: String = name.chars().take(len).collect();
    format!("{truncated:<len$}")
}

/// Formats `v` like C's `%g`.
///
/// With a precision, `p` significant digits are kept. Without one, the
/// shortest representation that round-trips is used. Exponential notation
/// is chosen when the decimal exponent is below -4 or at least the
/// precision (6 for the shortest form), and trailing zeros are removed.
pub fn format_g(v: Real, precision: Option<usize>) -> String {
    if v.is_nan() {
        return "NaN".to_string();
    }
    if v.is_infinite() {
        return if v > 0.0 { "+Inf" } else { "-Inf" }.to_string();
    }

    let (sci, limit) = match precision {
        Some(p) => {
            let p = p.max(1);
            (format!("{:.*e}", p - 1, v), p as i32)
        }
        None => (format!("{v:e}"), 6),
    };
    let (mantissa, exp) = match sci.split_once('e') {
        Some((m, e)) => (m, e.parse::<i32>().unwrap_or(0)),
        None => (sci.as_str(), 0),
    };

    if exp < -4 || exp >= limit {
        let sign = if exp < 0 { '-' } else { '+' };
        return format!("{}e{sign}{:02}", trim_zeros(mantissa), exp.unsigned_abs());
    }
    match precision {
        Some(_) => {
            let decimals = (limit - 1 - exp).max(0) as usize;
            trim_zeros(&format!("{v:.decimals$}")).to_string()
        }
        None => format!("{v}"),
    }
}

fn trim_zeros(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Shared(Arc<Mutex<Vec<u8>>>);

    impl Write for Shared {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn g_format_shortest() {
        assert_eq!(format_g(0.25, None), "0.25");
        assert_eq!(format_g(123456.0, None), "123456");
        assert_eq!(format_g(1234567.0, None), "1.234567e+06");
        assert_eq!(format_g(1e-5, None), "1e-05");
        assert_eq!(format_g(0.0001, None), "0.0001");
        assert_eq!(format_g(-3.0, None), "-3");
        assert_eq!(format_g(0.0, None), "0");
    }

    #[test]
    fn g_format_with_precision() {
        assert_eq!(format_g(0.5, Some(4)), "0.5");
        assert_eq!(format_g(3.14159265, Some(3)), "3.14");
        assert_eq!(format_g(1234567.0, Some(3)), "1.23e+06");
        assert_eq!(format_g(9.9999, Some(2)), "10");
        assert_eq!(format_g(100000.0, Some(8)), "100000");
        assert_eq!(format_g(0.000123456, Some(2)), "0.00012");
        assert_eq!(format_g(1.5e-7, Some(3)), "1.5e-07");
        assert_eq!(format_g(0.0, Some(3)), "0");
    }

    #[test]
    fn g_format_non_finite() {
        assert_eq!(format_g(Real::NAN, None), "NaN");
        assert_eq!(format_g(Real::INFINITY, Some(3)), "+Inf");
        assert_eq!(format_g(Real::NEG_INFINITY, None), "-Inf");
    }

    #[test]
    fn names_padded_or_truncated() {
        assert_eq!(fix_length("x", 4), "x   ");
        assert_eq!(fix_length("velocity", 4), "velo");
        assert_eq!(fix_length("abcd", 4), "abcd");
    }

    #[test]
    fn header_and_rows_are_buffered_until_flush() {
        let sink = Shared::default();
        let mut logger = ResultsLogger::new(sink.clone()).with_options(LogOptions {
            separator: ",".to_string(),
            format_len: 6,
            precision: Some(3),
            all_states: true,
        });

        let mut s = State::from_x_map([("a", 1.0), ("b", 2.5)]);
        s.u_equal("u", 0.125);
        logger.header("time", &s);
        logger.row(&s);
        assert!(sink.0.lock().unwrap().is_empty());

        logger.flush().unwrap();
        let text = String::from_utf8(sink.0.lock().unwrap().clone()).unwrap();
        assert_eq!(text, "time  ,a     ,b     ,u     \n     0,     1,   2.5, 0.125\n");
        assert!(logger.pending().is_empty());
    }

    #[test]
    fn last_state_only_when_not_logging_all() {
        let mut logger = ResultsLogger::new(io::sink()).with_options(LogOptions {
            all_states: false,
            ..LogOptions::default()
        });
        let mut a = State::from_x_map([("y", 1.0)]);
        let mut b = a.clone();
        a.set_time(0.5);
        b.set_time(1.0);
        logger.rows(&[a, b]);
        assert_eq!(logger.pending().lines().count(), 1);
        assert!(logger.pending().trim_start().starts_with('1'));
    }
}
