// Time and system boundary.

use onyx::system::{self, PathFlags, Timespec};
use onyx::value::Value;
use onyx::Vm;

#[test]
fn test_clocks_are_sane() {
    let vm = Vm::new();
    let wall = system::current_time(&vm).unwrap();
    assert!(wall.sec > 1_000_000_000); // later than 2001
    let m1 = system::monotonic_time(&vm).unwrap();
    let m2 = system::monotonic_time(&vm).unwrap();
    assert!(m2 >= m1);
}

#[test]
fn test_timespec_normalization_and_conversion() {
    let t = Timespec::new(0, 2_750_000_000);
    assert_eq!(t, Timespec { sec: 2, nsec: 750_000_000 });
    assert_eq!(
        system::timespec_of_value(&Value::Flonum(2.75)).unwrap(),
        Timespec { sec: 2, nsec: 750_000_000 }
    );
    assert_eq!(Timespec { sec: 2, nsec: 0 }.to_seconds_value(), Value::Fixnum(2));
    assert!(system::timespec_of_value(&Value::Flonum(-1.0)).is_err());
}

#[test]
fn test_directory_listing() {
    let dir = std::env::temp_dir().join(format!("onyx-test-{}", std::process::id()));
    std::fs::create_dir_all(dir.join("sub")).unwrap();
    std::fs::write(dir.join("a.txt"), b"x").unwrap();
    let mut entries = system::read_directory(dir.to_str().unwrap()).unwrap();
    entries.sort();
    assert!(entries.contains(&"a.txt".to_string()));
    assert!(entries.contains(&"sub".to_string()));
    std::fs::remove_dir_all(&dir).unwrap();

    let err = system::read_directory("/no/such/directory").unwrap_err();
    assert_eq!(err.tag(), "io/system");
    assert!(err.errno().is_some());
}

#[test]
fn test_path_normalization() {
    let canon = PathFlags {
        canonicalize: true,
        ..PathFlags::default()
    };
    assert_eq!(system::normalize_path("a/b/../c/./d", canon).unwrap(), "a/c/d");
    assert_eq!(system::normalize_path("/x/../y", canon).unwrap(), "/y");

    let abs = system::normalize_path("rel/path", PathFlags::all()).unwrap();
    assert!(system::is_absolute(&abs));
    assert!(abs.ends_with("rel/path"));
}

#[test]
fn test_tilde_expansion_against_env() {
    std::env::set_var("HOME", "/home/somebody");
    let expand = PathFlags {
        expand_tilde: true,
        ..PathFlags::default()
    };
    assert_eq!(system::normalize_path("~", expand).unwrap(), "/home/somebody");
    assert_eq!(
        system::normalize_path("~/a/b", expand).unwrap(),
        "/home/somebody/a/b"
    );
    // unexpanded without the flag
    assert_eq!(
        system::normalize_path("~/a", PathFlags::default()).unwrap(),
        "~/a"
    );
}

#[test]
fn test_signal_flag_roundtrip_through_clock() {
    let vm = Vm::new();
    vm.deliver_signal();
    // a clock read is a safe point; it must succeed with a signal pending
    assert!(system::monotonic_time(&vm).is_ok());
}
