use std::collections::HashMap;
use std::ffi::OsStr;

/// Environment variables starting with this prefix override cached flags.
pub const OVERRIDE_PREFIX: &str = "FLAGS_";

/// Build the override table from `(name, value)` pairs.
///
/// `FLAGS_MY_FLAG=true` registers `my_flag`, `my-flag` and `my flag`, all
/// `true`. Any value other than the exact string `"true"` means `false`,
/// including values that aren't valid UTF-8. Names that aren't UTF-8 are
/// skipped.
pub fn build_overrides<I, K, V>(vars: I) -> HashMap<String, bool>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<OsStr>,
    V: AsRef<OsStr>,
{
    let mut table = HashMap::new();
    for (key, value) in vars {
        let Some(rest) = key
            .as_ref()
            .to_str()
            .and_then(|k| k.strip_prefix(OVERRIDE_PREFIX))
        else {
            continue;
        };
        let enabled = value.as_ref() == "true";
        let name = rest.to_lowercase();
        table.insert(name.replace('_', "-"), enabled);
        table.insert(name.replace('_', " "), enabled);
        table.insert(name, enabled);
    }
    table
}

/// Override table for the current process environment. Recomputed on every
/// call so changes to the environment take effect immediately.
pub fn from_env() -> HashMap<String, bool> {
    build_overrides(std::env::vars_os())
}

pub fn lookup(table: &HashMap<String, bool>, name: &str) -> Option<bool> {
    table.get(name).copied()
}
