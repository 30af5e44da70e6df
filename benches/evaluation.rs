use std::collections::HashMap;

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};

use flagon_core::{
    eval::{EvaluatorContext, ExperimentEvaluator, ExperimentRequest},
    flag::{
        Bucket, Experiment, ExperimentStatus, ExperimentType, MatchOperator, MatchType, Slot,
        Target, TargetAction, TargetCondition, TargetKey, TargetKeyType, TargetMatch, TargetRule,
        Variation,
    },
    InternalUser, Properties, Workspace,
};

fn variation(id: u64, key: &str) -> Variation {
    Variation {
        id,
        key: key.to_owned(),
        is_dropped: false,
        parameter_configuration_id: None,
    }
}

fn country_condition(country: &str) -> TargetCondition {
    TargetCondition {
        key: TargetKey {
            key_type: TargetKeyType::UserProperty,
            name: "country".to_owned(),
        },
        matcher: TargetMatch {
            match_type: MatchType::Match,
            operator: MatchOperator::In,
            values: vec![country.into()],
        },
    }
}

fn workspace() -> Workspace {
    let ab_test = Experiment {
        id: 1,
        key: 1,
        experiment_type: ExperimentType::AbTest,
        identifier_type: "$id".to_owned(),
        status: ExperimentStatus::Running,
        version: 1,
        execution_version: 1,
        variations: vec![variation(10, "A"), variation(11, "B")],
        user_overrides: HashMap::new(),
        segment_overrides: vec![],
        target_audiences: vec![],
        target_rules: vec![],
        default_rule: TargetAction::Bucket { bucket_id: 1 },
        container_id: None,
        winner_variation_id: None,
    };
    let feature_flag = Experiment {
        id: 2,
        key: 2,
        experiment_type: ExperimentType::FeatureFlag,
        identifier_type: "$id".to_owned(),
        status: ExperimentStatus::Running,
        version: 1,
        execution_version: 1,
        variations: vec![variation(20, "A"), variation(21, "B")],
        user_overrides: HashMap::new(),
        segment_overrides: vec![],
        target_audiences: vec![],
        target_rules: vec![TargetRule {
            target: Target {
                conditions: vec![country_condition("US")],
            },
            action: TargetAction::Bucket { bucket_id: 2 },
        }],
        default_rule: TargetAction::Variation { variation_id: 20 },
        container_id: None,
        winner_variation_id: None,
    };
    let buckets = vec![
        Bucket {
            id: 1,
            seed: 42,
            slot_size: 10000,
            slots: vec![
                Slot {
                    start: 0,
                    end: 5000,
                    variation_id: 10,
                },
                Slot {
                    start: 5000,
                    end: 10000,
                    variation_id: 11,
                },
            ],
        },
        Bucket {
            id: 2,
            seed: 43,
            slot_size: 10000,
            slots: vec![Slot {
                start: 0,
                end: 10000,
                variation_id: 21,
            }],
        },
    ];
    Workspace::new(
        vec![ab_test],
        vec![feature_flag],
        vec![],
        buckets,
        vec![],
        vec![],
    )
}

fn criterion_benchmark(c: &mut Criterion) {
    let workspace = workspace();
    let evaluator = ExperimentEvaluator::new();
    let user = InternalUser::new(
        HashMap::from([("$id".to_owned(), "user-1".to_owned())]),
        Properties::from([("country".to_owned(), "US".into())]),
    );

    {
        let mut group = c.benchmark_group("ab-test");
        group.throughput(Throughput::Elements(1));
        let experiment = workspace.experiment(1).unwrap();
        group.bench_function("traffic_allocation", |b| {
            b.iter(|| {
                let request = ExperimentRequest::of(
                    black_box(&workspace),
                    black_box(&user),
                    black_box(experiment),
                );
                evaluator.evaluate_experiment(&request, &mut EvaluatorContext::new())
            })
        });
        group.finish();
    }

    {
        let mut group = c.benchmark_group("feature-flag");
        group.throughput(Throughput::Elements(1));
        let experiment = workspace.feature_flag(2).unwrap();
        group.bench_function("target_rule_match", |b| {
            b.iter(|| {
                let request = ExperimentRequest::of(
                    black_box(&workspace),
                    black_box(&user),
                    black_box(experiment),
                );
                evaluator.evaluate_experiment(&request, &mut EvaluatorContext::new())
            })
        });
        group.finish();
    }
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
