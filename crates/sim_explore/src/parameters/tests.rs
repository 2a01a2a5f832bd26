use super::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

fn mixed_space() -> ParameterSpace {
    ParameterSpace::new()
        .with_variable(VariableDescriptor::int("agents", 10, 100).step(10.0))
        .and_then(|s| s.with_variable(VariableDescriptor::float("rate", 0.0, 1.0).step(0.25)))
        .and_then(|s| s.with_variable(VariableDescriptor::boolean("adaptive")))
        .and_then(|s| {
            s.with_variable(VariableDescriptor::among(
                "policy",
                VariableKind::String,
                vec!["greedy".into(), "random".into(), "balanced".into()],
            ))
        })
        .unwrap()
}

#[test]
fn test_declare_rejects_inverted_bounds() {
    let mut space = ParameterSpace::new();
    let err = space
        .declare(VariableDescriptor::float("rate", 1.0, 0.0))
        .unwrap_err();
    assert!(matches!(err, ExploreError::InvalidDomain { .. }));
    assert!(space.is_empty());
}

#[test]
fn test_declare_rejects_empty_enumeration() {
    let mut space = ParameterSpace::new();
    let err = space
        .declare(VariableDescriptor::among("policy", VariableKind::String, vec![]))
        .unwrap_err();
    assert!(matches!(err, ExploreError::InvalidDomain { .. }));
}

#[test]
fn test_declare_rejects_duplicate_name() {
    let mut space = ParameterSpace::new();
    space.declare(VariableDescriptor::boolean("a")).unwrap();
    let err = space.declare(VariableDescriptor::boolean("a")).unwrap_err();
    assert!(err.is_configuration());
}

#[test]
fn test_log_scale_requires_positive_minimum() {
    let mut space = ParameterSpace::new();
    assert!(space
        .declare(VariableDescriptor::float("lr", 0.0, 1.0).log_scale())
        .is_err());
    assert!(space
        .declare(VariableDescriptor::float("lr", 1e-4, 1.0).log_scale())
        .is_ok());
}

#[test]
fn test_sampled_candidates_are_valid() {
    let space = mixed_space();
    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..200 {
        let candidate = space.sample_default(&mut rng).unwrap();
        assert!(space.validate(&candidate), "invalid sample {candidate}");
    }
}

#[test]
fn test_integer_samples_stay_on_step_grid() {
    let space = mixed_space();
    let mut rng = StdRng::seed_from_u64(3);
    for _ in 0..100 {
        let candidate = space.sample_default(&mut rng).unwrap();
        match candidate.get("agents") {
            Some(Value::Int(v)) => assert_eq!(v % 10, 0),
            other => panic!("unexpected value {other:?}"),
        }
    }
}

#[test]
fn test_validate_rejects_missing_extra_and_out_of_bounds() {
    let space = mixed_space();
    let valid = space.default_candidate();
    assert!(space.validate(&valid));

    let out_of_bounds = valid.with("rate", Value::float(1.5));
    assert!(!space.validate(&out_of_bounds));

    let extra = valid.with("unknown", Value::Int(1));
    assert!(!space.validate(&extra));

    let missing = CandidatePoint::new().set("agents", 10i64);
    assert!(!space.validate(&missing));
}

#[test]
fn test_free_text_cannot_be_sampled() {
    let space = ParameterSpace::new()
        .with_variable(VariableDescriptor::text("label", "baseline"))
        .unwrap();
    let mut rng = StdRng::seed_from_u64(1);
    let err = space.sample_default(&mut rng).unwrap_err();
    assert!(matches!(err, ExploreError::UnsupportedVariableKind { .. }));
    assert!(space.ensure_samplable().is_err());
    assert!(space.validate(&space.default_candidate()));
}

#[test]
fn test_candidate_equality_ignores_insertion_order() {
    use std::collections::HashSet;

    let a = CandidatePoint::new().set("x", 1i64).set("flag", true);
    let b = CandidatePoint::new().set("flag", true).set("x", 1i64);
    assert_eq!(a, b);

    let set: HashSet<_> = [a.clone(), b].into_iter().collect();
    assert_eq!(set.len(), 1);
    assert_eq!(a.names().collect::<Vec<_>>(), vec!["x", "flag"]);
}

#[test]
fn test_with_returns_copy() {
    let original = CandidatePoint::new().set("x", 1i64);
    let modified = original.with("x", Value::Int(2));
    assert_eq!(original.get("x"), Some(&Value::Int(1)));
    assert_eq!(modified.get("x"), Some(&Value::Int(2)));
}

#[test]
fn test_grid_values_cover_range() {
    let int = VariableDescriptor::int("n", 0, 10).step(5.0);
    assert_eq!(
        int.grid_values().unwrap(),
        vec![Value::Int(0), Value::Int(5), Value::Int(10)]
    );

    let float = VariableDescriptor::float("r", 0.0, 1.0).step(0.5);
    assert_eq!(
        float.grid_values().unwrap(),
        vec![Value::float(0.0), Value::float(0.5), Value::float(1.0)]
    );

    let unstepped = VariableDescriptor::float("r", 0.0, 1.0);
    assert_eq!(unstepped.grid_values().unwrap().len(), 11);
}

#[test]
fn test_unit_mapping_round_trips_on_scalar_domains() {
    let float = VariableDescriptor::float("r", 2.0, 4.0);
    assert_eq!(float.from_unit(0.5), Value::float(3.0));
    assert_eq!(float.to_unit(&Value::float(3.0)), Some(0.5));

    let int = VariableDescriptor::int("n", 0, 3);
    assert_eq!(int.from_unit(0.0), Value::Int(0));
    assert_eq!(int.from_unit(1.0), Value::Int(3));

    let flag = VariableDescriptor::boolean("b");
    assert_eq!(flag.from_unit(0.2), Value::Bool(false));
    assert_eq!(flag.from_unit(0.8), Value::Bool(true));
}

#[test]
fn test_complete_fills_missing_and_checks_given_values() {
    let space = mixed_space();
    let mut rng = StdRng::seed_from_u64(11);
    let partial = CandidatePoint::new().set("agents", 50i64);
    let full = space.complete(&partial, &mut rng).unwrap();
    assert!(space.validate(&full));
    assert_eq!(full.get("agents"), Some(&Value::Int(50)));

    let bad = CandidatePoint::new().set("agents", 500i64);
    assert!(space.complete(&bad, &mut rng).is_err());
}

#[test]
fn test_value_cells_parse_back() {
    for (kind, value) in [
        (VariableKind::Integer, Value::Int(-4)),
        (VariableKind::Float, Value::float(0.125)),
        (VariableKind::Boolean, Value::Bool(true)),
        (VariableKind::Date, Value::Date(1_700_000_000)),
        (VariableKind::Point, Value::point(1.0, 2.5, 0.0)),
        (VariableKind::String, Value::from("greedy")),
    ] {
        assert_eq!(Value::parse_as(kind, &value.to_string()), Some(value));
    }
}

#[test]
fn test_grid_is_full_factorial_in_declaration_order() {
    let space = ParameterSpace::new()
        .with_variable(VariableDescriptor::int("n", 0, 2))
        .and_then(|s| s.with_variable(VariableDescriptor::boolean("flag")))
        .unwrap();

    let grid = space.grid().unwrap();

    assert_eq!(grid.len(), 6);
    assert_eq!(space.grid_size().unwrap(), 6);
    assert_eq!(grid[0], CandidatePoint::new().set("n", 0i64).set("flag", false));
    assert_eq!(grid[1], CandidatePoint::new().set("n", 0i64).set("flag", true));
    assert_eq!(grid[5], CandidatePoint::new().set("n", 2i64).set("flag", true));
    assert!(grid.iter().all(|c| space.validate(c)));
}

#[test]
fn test_latin_hypercube_uses_every_stratum_once() {
    let space = ParameterSpace::new()
        .with_variable(VariableDescriptor::float("x", 0.0, 1.0))
        .and_then(|s| s.with_variable(VariableDescriptor::float("y", 0.0, 10.0)))
        .unwrap();
    let mut rng = StdRng::seed_from_u64(5);

    let design = space.latin_hypercube(10, &mut rng).unwrap();

    assert_eq!(design.len(), 10);
    for (name, width) in [("x", 1.0), ("y", 10.0)] {
        let mut strata: Vec<usize> = design
            .iter()
            .map(|c| {
                let v = c.get(name).and_then(Value::as_f64).unwrap();
                ((v / width) * 10.0).floor().min(9.0) as usize
            })
            .collect();
        strata.sort_unstable();
        assert_eq!(strata, (0..10).collect::<Vec<_>>());
    }
}

#[test]
fn test_beta_matrix_rejects_invalid_shape() {
    let space = ParameterSpace::new()
        .with_variable(VariableDescriptor::float("x", 0.0, 1.0))
        .unwrap();
    let mut rng = StdRng::seed_from_u64(5);
    assert!(space.beta_unit_matrix(4, 0.0, 1.0, &mut rng).is_err());
    let matrix = space.beta_unit_matrix(4, 2.0, 5.0, &mut rng).unwrap();
    assert_eq!(matrix.len(), 4);
    assert!(matrix.iter().flatten().all(|u| (0.0..=1.0).contains(u)));
}

#[test]
fn test_declare_rejects_integer_range_wider_than_i64() {
    let mut space = ParameterSpace::new();
    let err = space
        .declare(VariableDescriptor::int("id", i64::MIN, i64::MAX))
        .unwrap_err();
    assert!(matches!(err, ExploreError::InvalidDomain { .. }));
}

#[test]
fn test_integer_moves_near_i64_bounds_saturate() {
    let high = VariableDescriptor::int("high", i64::MAX - 4, i64::MAX).step(3.0);
    assert_eq!(
        high.neighbor_values(&Value::Int(i64::MAX)),
        vec![Value::Int(i64::MAX - 3), Value::Int(i64::MAX)]
    );
    let low = VariableDescriptor::int("low", i64::MIN, i64::MIN + 4);
    assert_eq!(
        low.neighbor_values(&Value::Int(i64::MIN)),
        vec![Value::Int(i64::MIN), Value::Int(i64::MIN + 1)]
    );

    let wide = VariableDescriptor::int("wide", 0, i64::MAX);
    assert_eq!(wide.from_unit(1.0), Value::Int(i64::MAX));
    assert_eq!(wide.from_unit(0.0), Value::Int(0));
    let mut rng = StdRng::seed_from_u64(1);
    for _ in 0..100 {
        let value = wide.sample(&mut rng).unwrap();
        assert!(wide.contains(&value));
    }
}
