use criterion::{black_box, criterion_group, criterion_main, Criterion};

use ielts_core::model::{QuestionType, Response};
use ielts_core::normalize::{normalize_letter, normalize_response, normalize_text};

const SHORT: &str = "  \u{201C}Library\u{201D}. ";
const LONG: &str = "  The   museum's NEW wing, opened in the   spring of 1998, houses \"early maps\"!!! ";

fn bench_text(c: &mut Criterion) {
    let mut group = c.benchmark_group("normalize_text");

    group.bench_function("short", |b| b.iter(|| normalize_text(black_box(SHORT))));
    group.bench_function("long", |b| b.iter(|| normalize_text(black_box(LONG))));

    group.finish();
}

fn bench_letters(c: &mut Criterion) {
    let mut group = c.benchmark_group("normalize_letters");

    group.bench_function("single", |b| b.iter(|| normalize_letter(black_box(" b "))));

    group.bench_function("multi_letter", |b| {
        let value = Response::from(vec!["e", "A", "c", "a", "G"]);
        b.iter(|| normalize_response(black_box(Some(&value)), &QuestionType::MultiLetter))
    });

    group.bench_function("multiple_choice_joined", |b| {
        let value = Response::from("d, b,a");
        b.iter(|| normalize_response(black_box(Some(&value)), &QuestionType::MultipleChoice))
    });

    group.finish();
}

criterion_group!(benches, bench_text, bench_letters);
criterion_main!(benches);
