use cia_ruleset::Ruleset;
use criterion::{black_box, criterion_group, criterion_main, Criterion};

const PROJECT_LIST: &str = r#"project is "cia" or project is "gnome" or project is "kde"
    or project is "freedesktop" or project is "xorg" or project is "mesa""#;

const CUSTOM: &str = r#"
# announce stable branches, skip bots
(project is "cia" and (branch is "trunk" or branch matches "release-*"))
    and not author matches "*bot"
    and not files contains "po/"
"#;

fn bench_parse(c: &mut Criterion) {
    c.bench_function("parse_project_list", |b| {
        b.iter(|| Ruleset::parse(black_box(PROJECT_LIST)))
    });
    c.bench_function("parse_custom", |b| b.iter(|| Ruleset::parse(black_box(CUSTOM))));

    let ruleset = Ruleset::parse(CUSTOM).expect("valid ruleset");
    c.bench_function("serialize_custom", |b| b.iter(|| black_box(&ruleset).to_string()));
}

criterion_group!(benches, bench_parse);
criterion_main!(benches);
