/// Defines a closure named after a cfg key that returns the first matching
/// value from the list, or "unknown".
macro_rules! get_cfg {
    ($i:ident : $($s:expr),+) => (
        let $i = || { $( if cfg!($i=$s) { return $s; } );+ "unknown"};
    )
}
