//! Time and system boundary.
//!
//! UTF-8 path operations are a single abstraction over camino, path-clean
//! and pathdiff; no other module imports those crates directly. Clocks go
//! through `clock_gettime`, retrying on `EINTR` after a signal check.
//! Failures surface as `io/system` conditions carrying errno.

use crate::number::arith;
use crate::value::condition::Condition;
use crate::value::Value;
use crate::vm::Vm;
use camino::{Utf8Path, Utf8PathBuf};
use std::ffi::CStr;
use std::time::{SystemTime, UNIX_EPOCH};

pub const NANOS_PER_SEC: u32 = 1_000_000_000;

/// A point in time or a duration: seconds plus nanoseconds, normalized so
/// 0 <= nsec < 1e9.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Timespec {
    pub sec: i64,
    pub nsec: u32,
}

impl Timespec {
    /// Build from possibly denormalized parts, carrying surplus
    /// nanoseconds into seconds.
    pub fn new(sec: i64, nsec: i64) -> Timespec {
        let sec = sec + nsec.div_euclid(NANOS_PER_SEC as i64);
        let nsec = nsec.rem_euclid(NANOS_PER_SEC as i64) as u32;
        Timespec { sec, nsec }
    }

    /// From a real number of seconds. Negative, NaN or out-of-range
    /// seconds are a domain error.
    pub fn from_real_seconds(seconds: f64) -> Result<Timespec, Condition> {
        if !seconds.is_finite() || seconds < 0.0 || seconds > i64::MAX as f64 {
            return Err(Condition::domain(format!(
                "seconds out of range: {}",
                seconds
            )));
        }
        let sec = seconds.trunc();
        let frac = seconds - sec;
        Ok(Timespec::new(sec as i64, (frac * NANOS_PER_SEC as f64) as i64))
    }

    /// Sum of two timespecs, renormalized.
    pub fn add(&self, other: &Timespec) -> Timespec {
        Timespec::new(
            self.sec + other.sec,
            self.nsec as i64 + other.nsec as i64,
        )
    }

    /// Seconds as a number value: exact when there are no nanoseconds.
    pub fn to_seconds_value(&self) -> Value {
        if self.nsec == 0 {
            Value::make_integer(self.sec)
        } else {
            Value::Flonum(self.sec as f64 + self.nsec as f64 / NANOS_PER_SEC as f64)
        }
    }

    pub fn to_seconds_f64(&self) -> f64 {
        self.sec as f64 + self.nsec as f64 / NANOS_PER_SEC as f64
    }
}

/// Timespec from a time value: an exact number of seconds or a real.
pub fn timespec_of_value(v: &Value) -> Result<Timespec, Condition> {
    if v.is_exact_integer() {
        let d = arith::get_double(v)?;
        if d < 0.0 || d > i64::MAX as f64 {
            return Err(Condition::domain(format!("seconds out of range: {}", d)));
        }
        Ok(Timespec::new(d as i64, 0))
    } else if v.is_real() {
        Timespec::from_real_seconds(arith::get_double(v)?)
    } else {
        Err(Condition::domain(format!(
            "time value required, but got {}",
            v.type_name()
        )))
    }
}

// =============================================================================
// Clocks
// =============================================================================

fn errno() -> i32 {
    std::io::Error::last_os_error().raw_os_error().unwrap_or(0)
}

fn clock_gettime(vm: &Vm, clock: libc::clockid_t, what: &str) -> Result<Timespec, Condition> {
    let mut ts = libc::timespec {
        tv_sec: 0,
        tv_nsec: 0,
    };
    loop {
        // SAFETY: ts is a properly initialized timespec and the clock id
        // is one of the constants below.
        let r = unsafe { libc::clock_gettime(clock, &mut ts) };
        if r == 0 {
            return Ok(Timespec::new(ts.tv_sec as i64, ts.tv_nsec as i64));
        }
        let e = errno();
        if e == libc::EINTR {
            vm.take_signal();
            continue;
        }
        return Err(Condition::system_error(
            format!("{}: clock_gettime failed", what),
            e,
        ));
    }
}

/// Wall-clock time since the Unix epoch.
pub fn current_time(vm: &Vm) -> Result<Timespec, Condition> {
    match SystemTime::now().duration_since(UNIX_EPOCH) {
        Ok(d) => Ok(Timespec::new(d.as_secs() as i64, d.subsec_nanos() as i64)),
        Err(_) => clock_gettime(vm, libc::CLOCK_REALTIME, "current-time"),
    }
}

/// Monotonic clock, unaffected by wall-clock adjustments.
pub fn monotonic_time(vm: &Vm) -> Result<Timespec, Condition> {
    clock_gettime(vm, libc::CLOCK_MONOTONIC, "monotonic-time")
}

/// Per-thread CPU time.
pub fn cpu_time(vm: &Vm) -> Result<Timespec, Condition> {
    clock_gettime(vm, libc::CLOCK_THREAD_CPUTIME_ID, "cpu-time")
}

// =============================================================================
// Directories
// =============================================================================

/// Entry names of a directory, including dot entries the platform reports.
pub fn read_directory(path: &str) -> Result<Vec<String>, Condition> {
    let rd = std::fs::read_dir(path).map_err(|e| {
        Condition::system_error(
            format!("couldn't open directory {:?}", path),
            e.raw_os_error().unwrap_or(0),
        )
    })?;
    let mut entries = Vec::new();
    for ent in rd {
        let ent = ent.map_err(|e| {
            Condition::system_error(
                format!("error reading directory {:?}", path),
                e.raw_os_error().unwrap_or(0),
            )
        })?;
        match ent.file_name().into_string() {
            Ok(name) => entries.push(name),
            Err(_) => {
                return Err(Condition::io_read(format!(
                    "directory entry in {:?} is not valid UTF-8",
                    path
                )))
            }
        }
    }
    Ok(entries)
}

// =============================================================================
// Pure path operations (no filesystem access)
// =============================================================================

/// Join path components. Absolute components replace the prefix.
pub fn join(components: &[&str]) -> String {
    let mut buf = Utf8PathBuf::new();
    for c in components {
        buf.push(c);
    }
    buf.into_string()
}

/// Parent directory. Returns `None` for root and empty string.
pub fn parent(path: &str) -> Option<&str> {
    Utf8Path::new(path).parent().map(Utf8Path::as_str)
}

/// File name (last component). Returns `None` for root or empty.
pub fn filename(path: &str) -> Option<&str> {
    Utf8Path::new(path).file_name()
}

/// Lexical normalization: resolve `.` and `..` without filesystem access.
pub fn lexical_normalize(path: &str) -> String {
    use path_clean::PathClean;
    // path-clean operates on std::path::Path. Round-trip is safe:
    // input is UTF-8, clean() only rearranges components.
    let std_path = Utf8Path::new(path).as_std_path();
    let cleaned = std_path.clean();
    cleaned
        .to_str()
        .expect("path-clean cannot introduce non-UTF-8 bytes from UTF-8 input")
        .to_string()
}

/// Compute relative path from `base` to `path`.
pub fn relative(path: &str, base: &str) -> Option<String> {
    pathdiff::diff_utf8_paths(Utf8Path::new(path), Utf8Path::new(base)).map(|p| p.into_string())
}

/// True if path is absolute.
pub fn is_absolute(path: &str) -> bool {
    Utf8Path::new(path).is_absolute()
}

// =============================================================================
// Path normalization with flags
// =============================================================================

/// What `normalize_path` should do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PathFlags {
    /// Expand a leading `~` or `~user`
    pub expand_tilde: bool,
    /// Prepend the current directory to relative paths
    pub absolutize: bool,
    /// Resolve `.` and `..` lexically
    pub canonicalize: bool,
}

impl PathFlags {
    pub fn all() -> PathFlags {
        PathFlags {
            expand_tilde: true,
            absolutize: true,
            canonicalize: true,
        }
    }
}

/// Current working directory.
pub fn cwd() -> Result<String, Condition> {
    let p = std::env::current_dir()
        .map_err(|e| Condition::system_error("couldn't get current directory", e.raw_os_error().unwrap_or(0)))?;
    p.to_str()
        .map(|s| s.to_string())
        .ok_or_else(|| Condition::io_read("current directory is not valid UTF-8"))
}

/// Home directory of the invoking user, from the environment when set.
fn own_home() -> Result<String, Condition> {
    if let Ok(home) = std::env::var("HOME") {
        if !home.is_empty() {
            return Ok(home);
        }
    }
    // SAFETY: geteuid has no preconditions; getpwuid returns a pointer to
    // static storage valid until the next passwd call on this thread.
    unsafe {
        let pw = libc::getpwuid(libc::geteuid());
        if pw.is_null() {
            return Err(Condition::system_error("couldn't get home directory", errno()));
        }
        passwd_dir((*pw).pw_dir)
    }
}

/// Home directory of a named user via the passwd database.
fn user_home(user: &str) -> Result<String, Condition> {
    let cname = std::ffi::CString::new(user)
        .map_err(|_| Condition::domain(format!("bad user name: {:?}", user)))?;
    // SAFETY: cname outlives the call; getpwnam returns a pointer to
    // static storage valid until the next passwd call on this thread.
    unsafe {
        let pw = libc::getpwnam(cname.as_ptr());
        if pw.is_null() {
            return Err(Condition::system_error(
                format!("couldn't get home directory of user {:?}", user),
                errno(),
            ));
        }
        passwd_dir((*pw).pw_dir)
    }
}

unsafe fn passwd_dir(dir: *const libc::c_char) -> Result<String, Condition> {
    if dir.is_null() {
        return Err(Condition::io_read("passwd entry has no home directory"));
    }
    CStr::from_ptr(dir)
        .to_str()
        .map(|s| s.to_string())
        .map_err(|_| Condition::io_read("home directory is not valid UTF-8"))
}

/// Expand `~` / `~user` at the front of a path.
fn expand_tilde(path: &str) -> Result<String, Condition> {
    debug_assert!(path.starts_with('~'));
    let rest = &path[1..];
    let (user, tail) = match rest.find('/') {
        Some(idx) => (&rest[..idx], rest[idx..].trim_start_matches('/')),
        None => (rest, ""),
    };
    let home = if user.is_empty() {
        own_home()?
    } else {
        user_home(user)?
    };
    if tail.is_empty() {
        Ok(home)
    } else {
        Ok(join(&[&home, tail]))
    }
}

/// Normalize a pathname under the given flags: tilde expansion, then
/// absolutization, then lexical canonicalization. Drive letters and
/// separator conventions are the UTF-8 path layer's concern.
pub fn normalize_path(path: &str, flags: PathFlags) -> Result<String, Condition> {
    let mut p = if flags.expand_tilde && path.starts_with('~') {
        expand_tilde(path)?
    } else {
        path.to_string()
    };
    if flags.absolutize && !is_absolute(&p) {
        p = join(&[&cwd()?, &p]);
    }
    if flags.canonicalize {
        p = lexical_normalize(&p);
    }
    Ok(p)
}

/// Resolve a path through the filesystem (symlinks resolved, must exist).
pub fn canonicalize(path: &str) -> Result<String, Condition> {
    let p = std::fs::canonicalize(path).map_err(|e| {
        Condition::system_error(
            format!("failed to resolve {:?}", path),
            e.raw_os_error().unwrap_or(0),
        )
    })?;
    p.to_str()
        .map(|s| s.to_string())
        .ok_or_else(|| Condition::io_read(format!("resolved path for {:?} is not valid UTF-8", path)))
}
