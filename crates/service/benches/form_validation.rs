use criterion::{black_box, criterion_group, criterion_main, Criterion};
use serde_json::json;

use models::form_field::FieldType;
use service::forms::{validate_submission, FieldSpec};

fn fields() -> Vec<FieldSpec> {
    vec![
        FieldSpec::new("summary", FieldType::Text).required().bounds(Some(3.0), Some(200.0)),
        FieldSpec::new("details", FieldType::Textarea),
        FieldSpec::new("savings", FieldType::Number).bounds(Some(0.0), None),
        FieldSpec::new("headcount", FieldType::Integer).bounds(Some(1.0), Some(500.0)),
        FieldSpec::new("urgent", FieldType::Boolean),
        FieldSpec::new("start", FieldType::Date),
        FieldSpec::new("contact", FieldType::Email),
        FieldSpec::new("link", FieldType::Url),
        FieldSpec::new("site", FieldType::Select).options(&["paris", "lyon", "lille"]),
        FieldSpec::new("teams", FieldType::Multiselect).options(&["it", "hr", "ops", "finance"]),
    ]
}

fn bench_validate(c: &mut Criterion) {
    let fields = fields();
    let valid = json!({
        "summary": "Move the print room next to the mail room",
        "details": "Saves walking time",
        "savings": 5400.0,
        "headcount": 12,
        "urgent": false,
        "start": "2024-09-01",
        "contact": "ops@example.com",
        "link": "https://wiki.example.com/print-room",
        "site": "lyon",
        "teams": ["ops", "finance"],
    });
    let invalid = json!({
        "summary": "x",
        "savings": -1,
        "headcount": 0.5,
        "start": "tomorrow",
        "site": "rome",
        "teams": ["ops", "ops"],
        "extra": true,
    });

    c.bench_function("form_validate_ok", |b| {
        b.iter(|| validate_submission(black_box(&fields), black_box(&valid)).unwrap())
    });
    c.bench_function("form_validate_errors", |b| {
        b.iter(|| validate_submission(black_box(&fields), black_box(&invalid)).unwrap_err())
    });
}

criterion_group!(benches, bench_validate);
criterion_main!(benches);
