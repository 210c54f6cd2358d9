use criterion::{black_box, criterion_group, criterion_main, Criterion};
use indoc::indoc;
use srpatch::{
    apply_edits, find_similar_lines, parse_edit_blocks, replace_most_similar_chunk, ApplyOptions,
    Fence, MemoryWorkspace,
};

// --- Parsing Benchmarks ---

fn parsing_benches(c: &mut Criterion) {
    let mut group = c.benchmark_group("Parsing");
    let fence = Fence::default();

    let simple_block = indoc! {r#"
        A reply with some text.

        src/main.rs
        ```rust
        <<<<<<< SEARCH
            println!("Hello, world!");
        =======
            println!("Hello, srpatch!");
        >>>>>>> REPLACE
        ```
    "#};
    group.bench_function("simple_block", |b| {
        b.iter(|| parse_edit_blocks(black_box(simple_block), &fence, &[]).unwrap())
    });

    // Many blocks, each naming its file
    let mut many_blocks = String::new();
    for i in 0..100 {
        many_blocks.push_str(&format!(
            "src/file_{i}.rs\n```rust\n<<<<<<< SEARCH\nold line {i}\n=======\nnew line {i}\n>>>>>>> REPLACE\n```\n\n"
        ));
    }
    group.bench_function("100_blocks", |b| {
        b.iter(|| parse_edit_blocks(black_box(&many_blocks), &fence, &[]).unwrap())
    });

    // Fuzzy filename resolution against a long list of known files
    let valid: Vec<String> = (0..200).map(|i| format!("src/module_{i}/mod.rs")).collect();
    let sloppy_name = "src/modul_150/mod.rs\n```rust\n<<<<<<< SEARCH\na\n=======\nb\n>>>>>>> REPLACE\n```\n";
    group.bench_function("fuzzy_filename_200_valid", |b| {
        b.iter(|| parse_edit_blocks(black_box(sloppy_name), &fence, &valid).unwrap())
    });

    // Large reply with one block at the end to test scanning speed
    let mut large_reply = "Lorem ipsum dolor sit amet...\n".repeat(1000);
    large_reply.push_str(simple_block);
    group.bench_function("large_reply_scan", |b| {
        b.iter(|| parse_edit_blocks(black_box(&large_reply), &fence, &[]).unwrap())
    });

    group.finish();
}

// --- Replacement Benchmarks ---

fn replacement_benches(c: &mut Criterion) {
    let mut group = c.benchmark_group("Replacement");

    let mut large_file = String::new();
    for i in 0..10000 {
        large_file.push_str(&format!("    This is line number {}\n", i));
    }

    let exact_part = "    This is line number 5000\n    This is line number 5001\n";
    group.bench_function("exact_match_large_file", |b| {
        b.iter(|| {
            black_box(replace_most_similar_chunk(
                black_box(&large_file),
                black_box(exact_part),
                "    CHANGED\n",
            ))
        });
    });

    // Indentation stripped: falls through to the whitespace-tolerant strategy
    let dedented_part = "This is line number 9000\nThis is line number 9001\n";
    group.bench_function("whitespace_match_large_file", |b| {
        b.iter(|| {
            black_box(replace_most_similar_chunk(
                black_box(&large_file),
                black_box(dedented_part),
                "CHANGED\n",
            ))
        });
    });

    // No strategy matches; every strategy scans the whole file
    let missing_part = "This line does not exist\n...\nNor does this one\n";
    group.bench_function("no_match_large_file", |b| {
        b.iter(|| {
            black_box(replace_most_similar_chunk(
                black_box(&large_file),
                black_box(missing_part),
                "x\n...\ny\n",
            ))
        });
    });

    group.finish();
}

// --- Diagnostics Benchmarks ---

fn diagnostics_benches(c: &mut Criterion) {
    let mut group = c.benchmark_group("Diagnostics");

    let mut file = String::new();
    for i in 0..2000 {
        file.push_str(&format!("let value_{i} = compute({i});\n"));
    }
    let search = "let value_1000 = compute(999);\nlet value_1001 = compute(1001);\n";
    group.bench_function("similar_lines_2000_lines", |b| {
        b.iter(|| black_box(find_similar_lines(black_box(search), black_box(&file))))
    });

    let large: String = (0..3000)
        .map(|i| format!("let value_{i} = compute({i});\n"))
        .collect();
    let long_search: String = (1500..1540)
        .map(|i| format!("let value_{i} = compute({i} + 1);\n"))
        .collect();
    group.bench_function("similar_lines_40_line_search_3000_lines", |b| {
        b.iter(|| black_box(find_similar_lines(black_box(&long_search), black_box(&large))))
    });

    group.finish();
}

// --- End-to-end ---

fn batch_benches(c: &mut Criterion) {
    let mut group = c.benchmark_group("Batch");

    let mut workspace = MemoryWorkspace::new();
    let mut reply = String::new();
    for i in 0..50 {
        workspace = workspace.with_file(format!("src/f{i}.rs"), format!("fn f{i}() {{}}\n"));
        reply.push_str(&format!(
            "src/f{i}.rs\n<<<<<<< SEARCH\nfn f{i}() {{}}\n=======\nfn f{i}() -> u8 {{ {i} }}\n>>>>>>> REPLACE\n\n"
        ));
    }
    let options = ApplyOptions::default();
    group.bench_function("apply_50_files_in_memory", |b| {
        b.iter(|| {
            let mut scratch = workspace.clone();
            black_box(apply_edits(black_box(&reply), &mut scratch, &[], &options).unwrap())
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    parsing_benches,
    replacement_benches,
    diagnostics_benches,
    batch_benches
);
criterion_main!(benches);
