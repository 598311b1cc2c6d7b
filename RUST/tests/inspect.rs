use peekgrid::*;
use rand::Rng;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

mod shapes {
    use std::fmt;

    pub struct Thing {
        val: String,
        arr: Vec<i32>,
        secret: u8,
    }
    peekgrid::inspect_struct!(Thing { val, arr, secret });

    impl Thing {
        pub fn new(val: &str, arr: Vec<i32>) -> Self {
            Self {
                val: val.to_string(),
                arr,
                secret: 7,
            }
        }
    }

    pub struct Unsorted {
        pub zeta: i32,
        pub alpha: i32,
        #[allow(non_snake_case)]
        pub Beta: i32,
    }
    peekgrid::inspect_struct!(Unsorted { zeta, alpha, Beta });

    #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
    pub struct Point {
        pub x: i32,
        pub y: i32,
    }
    peekgrid::inspect_struct!(Point { x, y });

    pub struct Broken;

    impl fmt::Display for Broken {
        fn fmt(&self, _f: &mut fmt::Formatter<'_>) -> fmt::Result {
            panic!("broken display")
        }
    }
    peekgrid::inspect_display!(Broken);
}

use shapes::{Broken, Point, Thing, Unsorted};

fn print_at(root: &dyn Inspect, path: &str) -> Option<String> {
    let path = AccessPath::from_dotted(path);
    with_resolved(root, path.segments(), |target| {
        target.map(|target| match target {
            Target::Value(value) => printable(value),
            Target::Range { interval, .. } => interval.token(),
        })
    })
}

fn keys_at(root: &dyn Inspect, path: &str, chunk_size: usize) -> Vec<String> {
    let path = AccessPath::from_dotted(path);
    with_resolved(root, path.segments(), |target| {
        target
            .map(|target| members(target, chunk_size).into_iter().map(|m| m.key).collect())
            .unwrap_or_default()
    })
}

fn labels_at(root: &dyn Inspect, path: &str) -> Vec<String> {
    let path = AccessPath::from_dotted(path);
    with_resolved(root, path.segments(), |target| {
        target
            .map(|target| {
                members(target, DEFAULT_CHUNK_SIZE)
                    .into_iter()
                    .map(|m| m.label)
                    .collect()
            })
            .unwrap_or_default()
    })
}

#[test]
fn empty_path_is_identity() {
    let thing = Thing::new("shoe", vec![1, 2, 3]);
    let no_segments: &[String] = &[];
    let same = with_resolved(&thing, no_segments, |target| match target {
        Some(Target::Value(value)) => std::ptr::eq(
            value as *const dyn Inspect as *const u8,
            &thing as *const Thing as *const u8,
        ),
        _ => false,
    });
    assert!(same);

    assert_eq!(print_at(&thing, ""), Some("Thing".to_string()));
    assert_eq!(keys_at(&thing, "", DEFAULT_CHUNK_SIZE), vec!["arr", "secret", "val"]);
}

#[test]
fn record_members_are_sorted_by_label() {
    let value = Unsorted {
        zeta: 1,
        alpha: 2,
        Beta: 3,
    };
    // Case-sensitive: upper case sorts first.
    assert_eq!(keys_at(&value, "", DEFAULT_CHUNK_SIZE), vec!["Beta", "alpha", "zeta"]);
    assert_eq!(print_at(&value, "alpha"), Some("2".to_string()));
}

#[test]
fn private_fields_are_reachable() {
    let thing = Thing::new("brush", vec![]);
    assert_eq!(print_at(&thing, "secret"), Some("7".to_string()));
    assert_eq!(print_at(&thing, "val"), Some("\"brush\"".to_string()));
}

#[test]
fn chunk_count_is_ceiling_of_length_over_threshold() {
    let mut rng = rand::thread_rng();
    for _ in 0..64 {
        let len: usize = rng.gen_range(1..400);
        let threshold: usize = rng.gen_range(1..60);
        let values: Vec<u16> = (0..len).map(|i| i as u16).collect();

        let keys = keys_at(&values, "", threshold);
        if len <= threshold {
            assert_eq!(keys.len(), len);
            assert_eq!(keys.first().map(String::as_str), Some("0"));
            continue;
        }

        assert_eq!(keys.len(), len.div_ceil(threshold), "len={len} threshold={threshold}");
        let last = Interval::parse(keys.last().unwrap()).unwrap();
        let expected_last = if len % threshold == 0 { threshold } else { len % threshold };
        assert_eq!(last.len(), expected_last);
        assert_eq!(last.to, len);
        let first = Interval::parse(&keys[0]).unwrap();
        assert_eq!(first, Interval::new(0, threshold));
    }
}

#[test]
fn chunk_re_expands_to_absolute_indices() {
    let values: Vec<i32> = (0..120).collect();
    assert_eq!(
        keys_at(&values, "", 50),
        vec!["0:50", "50:100", "100:120"]
    );

    let keys = keys_at(&values, "100:120", 50);
    assert_eq!(keys.len(), 20);
    assert_eq!(keys[0], "100");
    assert_eq!(keys[19], "119");

    // A chunk key followed by more segments indexes the full sequence.
    assert_eq!(print_at(&values, "100:120.105"), Some("105".to_string()));

    // A sub-range larger than the threshold is chunked again.
    assert_eq!(keys_at(&values, "0:120", 50), vec!["0:50", "50:100", "100:120"]);
}

#[test]
fn interval_resolution_is_clamped() {
    let values: Vec<i32> = (0..10).collect();
    assert_eq!(print_at(&values, "5:20"), Some("5:10".to_string()));
    assert_eq!(keys_at(&values, "5:20", DEFAULT_CHUNK_SIZE), vec!["5", "6", "7", "8", "9"]);
    assert_eq!(keys_at(&values, "2:5", DEFAULT_CHUNK_SIZE).len(), 3);
    assert!(keys_at(&values, "20:30", DEFAULT_CHUNK_SIZE).is_empty());

    assert_eq!(Interval::parse("5:3"), None);
    assert_eq!(Interval::parse("a:3"), None);
}

#[test]
fn stale_paths_resolve_to_missing() {
    let thing = Thing::new("shoe", vec![1, 2, 3]);
    assert_eq!(print_at(&thing, "arr.99"), None);
    assert_eq!(print_at(&thing, "nope"), None);
    assert_eq!(print_at(&thing, "val.deeper"), None);
    assert_eq!(print_at(&thing, "arr.x"), None);

    let empty: Option<Box<Thing>> = None;
    assert_eq!(print_at(&empty, "val"), None);
}

#[test]
fn references_and_locks_are_dereferenced() {
    let shared = Arc::new(parking_lot::RwLock::new(Thing::new("shoe", vec![1, 2, 3])));
    assert_eq!(print_at(&shared, "val"), Some("\"shoe\"".to_string()));
    assert_eq!(keys_at(&shared, "arr", DEFAULT_CHUNK_SIZE), vec!["0", "1", "2"]);

    let boxed: Option<Box<Thing>> = Some(Box::new(Thing::new("brush", vec![4])));
    assert_eq!(print_at(&boxed, "arr.0"), Some("4".to_string()));
}

#[test]
fn poisoned_lock_is_read_through() {
    let shared = Arc::new(Mutex::new(Thing::new("shoe", vec![1])));
    let poisoner = Arc::clone(&shared);
    let _ = std::thread::spawn(move || {
        let _guard = poisoner.lock().unwrap();
        panic!("poison the lock");
    })
    .join();
    assert!(shared.is_poisoned());

    assert_eq!(print_at(&shared, "val"), Some("\"shoe\"".to_string()));
}

#[test]
fn scalars_print_in_fixed_forms() {
    assert_eq!(printable(&"hi".to_string()), "\"hi\"");
    assert_eq!(printable(&"tab\there"), "\"tab\\there\"");
    assert_eq!(printable(&42i64), "42");
    assert_eq!(printable(&-3i8), "-3");
    assert_eq!(printable(&true), "true");
    assert_eq!(printable(&1.5f64), "1.500000");
    assert_eq!(printable(&'x'), "'x'");
    assert_eq!(printable(&None::<i32>), NONE_LITERAL);
    assert_eq!(printable(&Some(3)), "*3");
    assert_eq!(printable(&Box::new("s".to_string())), "*\"s\"");
    // Only one level of reference is marked.
    assert_eq!(printable(&Some(Box::new(3))), "Option<Box<i32>>");
    assert_eq!(printable(&vec![1, 2, 3]), "Vec<i32> (3)");
    assert_eq!(printable(&Thing::new("shoe", vec![])), "Thing");
}

#[test]
fn printing_is_idempotent() {
    let thing = Thing::new("shoe", vec![1, 2, 3]);
    let values: [&dyn Inspect; 4] = [&thing, &1.25f32, &"x", &Some(false)];
    for value in values {
        assert_eq!(printable(value), printable(value));
    }
}

#[test]
fn long_values_are_truncated_within_budget() {
    let long = "a".repeat(100);
    let printed = safe_printable("key", "Owner", &long, MAX_PRINTABLE_LEN);
    assert_eq!(printed.chars().count(), MAX_PRINTABLE_LEN);
    assert!(printed.ends_with("...(102)"));
    assert!(printed.starts_with("\"aaa"));

    let short = safe_printable("key", "Owner", &"abc", MAX_PRINTABLE_LEN);
    assert_eq!(short, "\"abc\"");

    assert_eq!(ellipsis("héllo wörld".to_string(), 8), "h...(11)");

    // No room for the suffix: cut to the limit.
    let tiny = ellipsis("x".repeat(200), 5);
    assert_eq!(tiny, "xxxxx");
    assert_eq!(ellipsis("x".repeat(200), 8), "...(200)");
    assert_eq!(ellipsis("abc".to_string(), 0), "");
}

#[test]
fn zero_forms_are_classified() {
    for value in [
        printable(&String::new()),
        printable(&0u32),
        printable(&false),
        printable(&None::<String>),
        printable(&0.0f64),
    ] {
        assert!(is_zero_printable(&value), "{value} should be zero");
    }
    for value in ["0.0", "\" \"", "*0", "Vec<i32> (0)"] {
        assert!(!is_zero_printable(value), "{value} should not be zero");
    }
}

#[test]
fn panicking_display_yields_fallback() {
    let printed = safe_printable("flaky", "Holder", &Broken, MAX_PRINTABLE_LEN);
    assert_eq!(printed, "Broken");

    let boxed = Box::new(Broken);
    assert_eq!(safe_printable("flaky", "Holder", &boxed, MAX_PRINTABLE_LEN), "Box<Broken>");
}

#[test]
fn text_and_integer_keys_are_used_directly() {
    let mut by_name: BTreeMap<String, i32> = BTreeMap::new();
    by_name.insert("shoe".to_string(), 1);
    by_name.insert("a.b".to_string(), 2);
    by_name.insert(String::new(), 3);

    let keys = keys_at(&by_name, "", DEFAULT_CHUNK_SIZE);
    assert!(keys.contains(&"shoe".to_string()));
    assert!(!keys.contains(&"a.b".to_string()));
    assert_eq!(labels_at(&by_name, ""), vec!["", "a.b", "shoe"]);

    // Every token resolves back to its own entry.
    for key in keys {
        assert!(print_at(&by_name, &key).is_some(), "token {key} did not resolve");
    }
    assert_eq!(print_at(&by_name, &fingerprint(&"a.b".to_string())), Some("2".to_string()));

    let mut by_id: BTreeMap<u64, &str> = BTreeMap::new();
    by_id.insert(9, "nine");
    by_id.insert(10, "ten");
    by_id.insert(100, "hundred");
    // Labels sort as text.
    assert_eq!(keys_at(&by_id, "", DEFAULT_CHUNK_SIZE), vec!["10", "100", "9"]);
    assert_eq!(print_at(&by_id, "100"), Some("\"hundred\"".to_string()));
}

#[test]
fn struct_keyed_map_fingerprints_round_trip() {
    let mut by_point: HashMap<Point, String> = HashMap::new();
    by_point.insert(Point { x: 1, y: 2 }, "one-two".to_string());
    by_point.insert(Point { x: 2, y: 1 }, "two-one".to_string());

    let a = fingerprint(&Point { x: 1, y: 2 });
    assert_eq!(a, fingerprint(&Point { x: 1, y: 2 }));
    assert_ne!(a, fingerprint(&Point { x: 2, y: 1 }));
    assert_eq!(a.len(), 16);
    assert!(a.chars().all(|c| c.is_ascii_hexdigit()));

    let keys = keys_at(&by_point, "", DEFAULT_CHUNK_SIZE);
    assert_eq!(keys.len(), 2);
    assert!(keys.contains(&a));
    assert_eq!(print_at(&by_point, &a), Some("\"one-two\"".to_string()));
    assert_eq!(print_at(&by_point, "0000000000000000"), None);
}

#[test]
fn nested_map_fingerprint_ignores_iteration_order() {
    let mut first: HashMap<String, i32> = HashMap::new();
    let mut second: HashMap<String, i32> = HashMap::new();
    for i in 0..32 {
        first.insert(format!("k{i}"), i);
    }
    for i in (0..32).rev() {
        second.insert(format!("k{i}"), i);
    }
    assert_eq!(fingerprint(&first), fingerprint(&second));

    second.insert("k0".to_string(), -1);
    assert_ne!(fingerprint(&first), fingerprint(&second));
}

#[test]
fn tuple_keys_use_fingerprints() {
    let mut by_bin: HashMap<(i32, i32), &str> = HashMap::new();
    by_bin.insert((0, 1), "bolts");
    by_bin.insert((4, 0), "washers");

    let token = key_token(&(4, 0));
    assert_eq!(token, fingerprint(&(4, 0)));
    assert_eq!(print_at(&by_bin, &token), Some("\"washers\"".to_string()));
    assert_eq!(key_label(&(4, 0)), "(i32, i32)");
}

#[test]
fn json_values_are_explorable() {
    let value = serde_json::json!({"name": "shoe", "sizes": [40, 41.5], "lace": null});
    assert!(is_explorable(&value));
    assert_eq!(keys_at(&value, "", DEFAULT_CHUNK_SIZE), vec!["lace", "name", "sizes"]);
    assert_eq!(print_at(&value, "name"), Some("\"shoe\"".to_string()));
    assert_eq!(print_at(&value, "sizes.1"), Some("41.500000".to_string()));
    assert_eq!(print_at(&value, "lace"), Some(NONE_LITERAL.to_string()));
    assert_eq!(print_at(&value, "sizes"), Some("array (2)".to_string()));
}

#[test]
fn explorable_shapes() {
    assert!(is_explorable(&Thing::new("shoe", vec![])));
    assert!(is_explorable(&vec![1]));
    assert!(!is_explorable(&Vec::<i32>::new()));
    assert!(is_explorable(&[0u8; 0]));
    assert!(!is_explorable(&BTreeMap::<String, i32>::new()));
    assert!(!is_explorable(&None::<Thing>));
    assert!(is_explorable(&Some(Box::new(Thing::new("shoe", vec![])))));
    assert!(!is_explorable(&5));
    assert!(!is_explorable(&"text"));
    assert!(is_explorable(&Mutex::new(vec![1, 2])));
}

#[test]
fn type_names_drop_module_paths() {
    assert_eq!(short_type_name("alloc::vec::Vec<alloc::string::String>"), "Vec<String>");
    assert_eq!(
        short_type_name("std::collections::hash::map::HashMap<i32, my_crate::model::Point>"),
        "HashMap<i32, Point>"
    );
    assert_eq!(Thing::new("x", vec![]).type_name(), "Thing");
}
