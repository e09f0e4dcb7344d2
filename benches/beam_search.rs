use criterion::{criterion_group, criterion_main, Criterion};
use dl_learner::cache::InstanceCache;
use dl_learner::ontology::Hierarchy;
use dl_learner::search::{BeamSearch, StructuralEvaluator};
use dl_learner::utils::synthetic::{random_fact_base, Shape};
use dl_learner::{LearnerConfig, RefinementOperator};

fn shape() -> Shape {
    Shape {
        individuals: 300,
        classes: 20,
        roles: 3,
        fan_out: 3,
    }
}

fn bench_instance_cache(c: &mut Criterion) {
    let kb = random_fact_base(42, shape());
    let config = LearnerConfig::el().with_min_support(10);
    let hierarchy = Hierarchy::build(&kb, &kb, None, &config).unwrap();

    c.bench_function("instance_cache_build", |b| {
        b.iter(|| InstanceCache::build(&kb, &hierarchy, &config))
    });
}

fn bench_beam_search(c: &mut Criterion) {
    let kb = random_fact_base(42, shape());
    let config = LearnerConfig::el()
        .with_min_support(10)
        .with_max_concept_length(4)
        .with_beam_size(20);
    let hierarchy = Hierarchy::build(&kb, &kb, None, &config).unwrap();
    let cache = InstanceCache::build(&kb, &hierarchy, &config);

    c.bench_function("beam_search_el", |b| {
        b.iter(|| {
            let operator = RefinementOperator::new(&hierarchy, config.clone()).unwrap();
            let mut search = BeamSearch::new(operator, StructuralEvaluator::new(&cache));
            search.run()
        })
    });
}

criterion_group!(benches, bench_instance_cache, bench_beam_search);
criterion_main!(benches);
