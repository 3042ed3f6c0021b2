use mesh_transform::intern::RegistryStats;
use mesh_transform::prelude::*;
use serial_test::serial;

#[test]
#[serial]
fn equal_arguments_hit_the_registry() -> Result<(), Box<dyn std::error::Error>> {
    let before = TransformKind::Point.registry_stats();
    let a = Transform::point(1)?;
    let b = Transform::point(1)?;
    let c = Transform::construct(TransformKind::Point, Args::new().kwarg("sign", 1i64))?;
    assert!(Transform::ptr_eq(&a, &b));
    assert!(Transform::ptr_eq(&a, &c));
    let after = TransformKind::Point.registry_stats();
    assert_eq!(after.misses - before.misses, 1);
    assert_eq!(after.hits - before.hits, 2);
    assert_eq!(after.live, 1);
    drop((a, b, c));
    assert_eq!(TransformKind::Point.registry_stats().live, 0);
    Ok(())
}

#[test]
#[serial]
fn expired_instances_are_rebuilt() {
    let first = Transform::scale_uniform(3, 0.123);
    let id = first.id();
    assert!(first.is_interned());
    drop(first);
    let second = Transform::scale_uniform(3, 0.123);
    assert_ne!(second.id(), id);
    let again = Transform::scale_uniform(3, 0.123);
    assert_eq!(second, again);
}

#[test]
#[serial]
fn unhashable_arguments_are_counted_as_bypassed() {
    let before = TransformKind::Scale.registry_stats();
    let a = Transform::scale(vec![1.0, f64::INFINITY]);
    let b = Transform::scale(vec![1.0, f64::INFINITY]);
    assert_ne!(a, b);
    assert!(!a.is_interned());
    let after = TransformKind::Scale.registry_stats();
    assert_eq!(after.bypassed - before.bypassed, 2);
    assert_eq!(after.misses, before.misses);
}

#[test]
#[serial]
fn purge_sweeps_nothing_after_eager_removal() {
    {
        let _t = Transform::identity(17);
        assert!(TransformKind::Identity.registry_stats().live >= 1);
    }
    assert_eq!(TransformKind::Identity.purge_registry(), 0);
}

#[test]
#[serial]
fn concurrent_constructions_share_one_instance() {
    let handles: Vec<Transform> = std::thread::scope(|s| {
        let workers: Vec<_> = (0..8)
            .map(|_| s.spawn(|| Transform::scale_uniform(2, 0.375)))
            .collect();
        workers.into_iter().map(|w| w.join().unwrap()).collect()
    });
    for h in &handles[1..] {
        assert!(Transform::ptr_eq(&handles[0], h));
    }
}

#[test]
fn summary_reports_effectivity() {
    let unused = RegistryStats::default();
    assert_eq!(unused.summary(), "not used");
    let stats = RegistryStats {
        hits: 3,
        misses: 1,
        bypassed: 0,
        live: 1,
    };
    assert_eq!(stats.summary(), "effectivity 75% (3 hits, 1 misses)");
}

#[test]
#[serial]
fn chains_work_as_map_keys() {
    use std::collections::HashMap;

    let token = RootToken::fresh();
    let build = || {
        Chain::new(Transform::root(2, token))
            .push(Transform::scale_uniform(2, 0.5))
            .unwrap()
    };
    let mut index = HashMap::new();
    index.insert(build(), 7usize);
    assert_eq!(index.get(&build()), Some(&7));
}
