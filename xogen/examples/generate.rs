//! Example generating the `rust` target from a fact snapshot.
//!
//! Run with: `cargo run --example generate -- [output dir]`

use anyhow::Context;
use serde_json::json;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use xogen::prelude::*;

fn library_facts() -> anyhow::Result<Facts> {
    let facts = json!({
        "driver": "postgres",
        "schema": "library",
        "enums": [
            {
                "name": "book_format",
                "values": [
                    { "name": "hardcover", "const_value": 1 },
                    { "name": "paperback", "const_value": 2 },
                    { "name": "ebook", "const_value": 3 }
                ]
            }
        ],
        "tables": [
            {
                "kind": "table",
                "name": "author",
                "columns": [
                    { "ordinal": 1, "name": "author_id", "datatype": { "type": "integer" },
                      "is_primary": true, "is_sequence": true },
                    { "ordinal": 2, "name": "name", "datatype": { "type": "text" } }
                ],
                "indexes": [
                    { "name": "author_name_idx", "columns": [ { "seq_no": 1, "column": "name" } ] }
                ]
            },
            {
                "kind": "table",
                "name": "book",
                "columns": [
                    { "ordinal": 1, "name": "book_id", "datatype": { "type": "integer" },
                      "is_primary": true, "is_sequence": true },
                    { "ordinal": 2, "name": "author_id", "datatype": { "type": "integer" } },
                    { "ordinal": 3, "name": "isbn", "datatype": { "type": "character varying", "prec": 32 } },
                    { "ordinal": 4, "name": "format", "datatype": { "type": "book_format" } },
                    { "ordinal": 5, "name": "published", "datatype": { "type": "date", "nullable": true } }
                ],
                "indexes": [
                    { "name": "book_isbn_key", "is_unique": true,
                      "columns": [ { "seq_no": 1, "column": "isbn" } ] }
                ],
                "foreign_keys": [
                    { "name": "book_author_id_fkey", "column": "author_id",
                      "ref_table": "author", "ref_column": "author_id", "key_id": 1 }
                ]
            }
        ]
    });
    Ok(Facts::from_json(&facts.to_string())?)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let out_dir = std::env::args()
        .nth(1)
        .map_or_else(|| PathBuf::from("models"), PathBuf::from);

    let query = QueryBuilder::new("postgres", "books_by_author_name")
        .sql(
            "-- Returns every book written by an author.\n\
             SELECT b.book_id, b.isbn\n\
             FROM library.book b JOIN library.author a ON a.author_id = b.author_id\n\
             WHERE a.name = %%name text%%",
        )
        .fields(vec![
            Field::new("book_id", Datatype::new("integer")),
            Field::new("isbn", Datatype::new("character varying")),
        ])
        .build()?;

    let registry = Registry::with_builtin();
    let loader = StaticLoader::new(library_facts()?);
    let values = FlagValues::new().with("pkg", "library");
    let mut run = GenerationRun::new(&registry, "rust", values);
    let files = run
        .run(&loader, "library", vec![query], &CancellationToken::new())
        .await?;

    std::fs::create_dir_all(&out_dir)
        .with_context(|| format!("creating {}", out_dir.display()))?;
    for file in &files {
        let path = out_dir.join(file.file_name());
        std::fs::write(&path, &file.content)
            .with_context(|| format!("writing {}", path.display()))?;
        tracing::info!("Wrote {} ({} bytes)", path.display(), file.content.len());
    }
    Ok(())
}
