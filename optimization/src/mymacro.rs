/// Writes a progress or warning line to the training log when display is enabled.
///
/// `trainlog!(log, display, "label" => value)` writes `label : value`, anything else is passed
/// on to `writeln!`. Write failures are propagated with `?`.
macro_rules! trainlog {
    ($log:expr, $display:expr, $infor:literal => $value:expr) => {
        if $display {
            writeln!($log, "{} : {}", $infor, $value)?;
        }
    };
    ($log:expr, $display:expr, $($arg:tt)+) => {
        if $display {
            writeln!($log, $($arg)+)?;
        }
    };
}
