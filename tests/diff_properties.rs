//! Cross-engine laws: identity, swapped inputs, document order

use pretty_assertions::assert_eq;

use page_watch::diff::{
    ChangeKind, ChangeRecord, RasterImage, compare_images, diff_markup, diff_words, extract_text,
};

const SAMPLES: &[&str] = &[
    "",
    "single",
    "The quick brown fox jumps over the lazy dog",
    "Widget\n\n  Price: $10   In stock",
    "naïve café – 日本語 テキスト",
];

/// The records the same hunks produce when the inputs are swapped: kinds
/// flip and each hunk still lists its deletion before its addition
fn swapped(hunks: &[Vec<ChangeRecord>]) -> Vec<ChangeRecord> {
    hunks
        .iter()
        .flat_map(|hunk| {
            let mut inverted: Vec<ChangeRecord> = hunk
                .iter()
                .map(|r| ChangeRecord {
                    kind: r.kind.inverse(),
                    value: r.value.clone(),
                })
                .collect();
            inverted.sort_by_key(|r| r.kind == ChangeKind::Addition);
            inverted
        })
        .collect()
}

#[test]
fn test_text_identity() {
    for sample in SAMPLES {
        assert!(diff_words(sample, sample).is_empty(), "{sample:?}");
    }
}

#[test]
fn test_text_swapped_inputs_invert_kinds() {
    let cases = [
        (
            "one two three",
            "one 2 three",
            vec![vec![ChangeRecord::deletion("two"), ChangeRecord::addition("2")]],
        ),
        (
            "Price: $10 In stock",
            "Price: $12 Sold out",
            vec![vec![
                ChangeRecord::deletion("$10 In stock"),
                ChangeRecord::addition("$12 Sold out"),
            ]],
        ),
        (
            "alpha beta gamma",
            "alpha gamma delta",
            vec![
                vec![ChangeRecord::deletion("beta")],
                vec![ChangeRecord::addition("delta")],
            ],
        ),
        (
            "one two three four",
            "zero one three four five",
            vec![
                vec![ChangeRecord::addition("zero")],
                vec![ChangeRecord::deletion("two")],
                vec![ChangeRecord::addition("five")],
            ],
        ),
        (
            "a b c d e",
            "a X c Y e",
            vec![
                vec![ChangeRecord::deletion("b"), ChangeRecord::addition("X")],
                vec![ChangeRecord::deletion("d"), ChangeRecord::addition("Y")],
            ],
        ),
        ("", "now there is text", vec![vec![ChangeRecord::addition("now there is text")]]),
    ];

    for (a, b, hunks) in cases {
        let forward: Vec<ChangeRecord> = hunks.iter().flatten().cloned().collect();
        assert_eq!(diff_words(a, b), forward, "{a:?} -> {b:?}");
        assert_eq!(diff_words(b, a), swapped(&hunks), "{b:?} -> {a:?}");
    }
}

#[test]
fn test_text_changes_follow_document_order() {
    let records = diff_words("a b c d e f", "a X c d Y f");
    assert_eq!(
        records,
        vec![
            ChangeRecord::deletion("b"),
            ChangeRecord::addition("X"),
            ChangeRecord::deletion("e"),
            ChangeRecord::addition("Y"),
        ]
    );
}

#[test]
fn test_markup_identity() {
    let docs = [
        "",
        "<p>Hello</p>",
        "<html><body><ul><li>One<li>Two</ul><img src=x.png></body></html>",
        "<div><p>Unclosed <b>bold</div>",
    ];
    for doc in docs {
        assert!(diff_markup(doc, doc).is_empty(), "{doc:?}");
    }
}

#[test]
fn test_markup_swapped_inputs_invert_kinds() {
    let before = "<main><h1>Plans</h1><p>Basic</p></main>";
    let after = "<main><h1>Plans</h1><p>Basic</p><p>Pro <em>new</em></p></main>";

    let forward = diff_markup(before, after);
    assert_eq!(forward, vec![ChangeRecord::addition("Pro <em>new</em>")]);

    let backward = diff_markup(after, before);
    assert_eq!(backward, vec![ChangeRecord::deletion("Pro <em>new</em>")]);
}

#[test]
fn test_extracted_text_diff_ignores_markup_noise() {
    let before = "<body><nav>Menu</nav><p>Price:   <b>$10</b></p><script>x()</script></body>";
    let after = "<body>\n<nav>Other menu</nav>\n<p>Price: <b>$10</b></p>\n</body>";
    assert!(diff_words(&extract_text(before), &extract_text(after)).is_empty());
}

#[test]
fn test_visual_identity_and_swap() {
    let white = RasterImage::solid(32, 24, [255, 255, 255, 255]);
    assert_eq!(compare_images(&white, &white).pixel_count, 0);

    let mut pixels = white.as_bytes().to_vec();
    for y in 4..8u32 {
        for x in 10..20u32 {
            let idx = ((y * 32 + x) * 4) as usize;
            pixels[idx..idx + 4].copy_from_slice(&[0, 0, 0, 255]);
        }
    }
    let marked = RasterImage::new(32, 24, pixels).unwrap();

    let forward = compare_images(&white, &marked);
    let backward = compare_images(&marked, &white);
    assert_eq!(forward.pixel_count, 40);
    assert_eq!(backward.pixel_count, forward.pixel_count);
}

#[test]
fn test_visual_mismatch_compares_overlap() {
    let small = RasterImage::solid(10, 10, [255, 255, 255, 255]);
    let large = RasterImage::solid(20, 15, [255, 255, 255, 255]);

    let result = compare_images(&small, &large);
    assert!(result.cropped);
    assert_eq!((result.compared_width, result.compared_height), (10, 10));
    assert_eq!(result.pixel_count, 0);
}
