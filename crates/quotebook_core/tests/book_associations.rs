use quotebook_core::db::open_db_in_memory;
use quotebook_core::{
    AuthorDraft, AuthorRepository, BookDraft, BookRepository, CategoryDraft, CategoryRepository,
    EnrichmentPolicy, QuoteDraft, QuoteRepository, RepoError, SqliteAuthorRepository,
    SqliteBookRepository, SqliteCategoryRepository, SqliteQuoteRepository,
};
use rusqlite::Connection;

struct Fixture {
    first_author: i64,
    second_author: i64,
    fantasy: i64,
    classic: i64,
}

fn seed(conn: &Connection) -> Fixture {
    let authors = SqliteAuthorRepository::try_new(conn).unwrap();
    let categories = SqliteCategoryRepository::try_new(conn).unwrap();
    Fixture {
        first_author: authors.create(&AuthorDraft::new("Terry Pratchett")).unwrap().id,
        second_author: authors.create(&AuthorDraft::new("Neil Gaiman")).unwrap().id,
        fantasy: categories.create(&CategoryDraft::new("Fantasy")).unwrap().id,
        classic: categories.create(&CategoryDraft::new("Classic")).unwrap().id,
    }
}

fn count(conn: &Connection, table: &str) -> i64 {
    conn.query_row(&format!("SELECT COUNT(*) FROM {table};"), [], |row| {
        row.get(0)
    })
    .unwrap()
}

#[test]
fn create_preserves_author_order_and_categories() {
    let conn = open_db_in_memory().unwrap();
    let fx = seed(&conn);
    let books = SqliteBookRepository::try_new(&conn).unwrap();

    let created = books
        .create(
            &BookDraft::new("Good Omens", 1990)
                .with_isbn("978-0-575-04800-6")
                .with_publisher("Gollancz")
                .with_pages(288),
            &[fx.first_author, fx.second_author],
            &[fx.fantasy, fx.classic],
        )
        .unwrap();

    let loaded = books.find_by_id(created.id).unwrap().unwrap();
    assert_eq!(loaded, created);
    assert_eq!(loaded.author_ids(), vec![fx.first_author, fx.second_author]);
    assert_eq!(
        loaded.authors.iter().map(|entry| entry.order).collect::<Vec<_>>(),
        vec![1, 2]
    );
    assert_eq!(loaded.category_ids(), vec![fx.classic, fx.fantasy]);
    assert_eq!(loaded.isbn.as_deref(), Some("978-0-575-04800-6"));
    assert_eq!(loaded.pages, 288);
}

#[test]
fn failed_create_leaves_no_rows_behind() {
    let conn = open_db_in_memory().unwrap();
    let fx = seed(&conn);
    let books = SqliteBookRepository::try_new(&conn).unwrap();

    let err = books
        .create(
            &BookDraft::new("Twice Written", 2001),
            &[fx.first_author, fx.first_author],
            &[fx.fantasy],
        )
        .unwrap_err();
    assert!(err.is_constraint_violation());

    assert_eq!(books.count().unwrap(), 0);
    assert_eq!(count(&conn, "book_author"), 0);
    assert_eq!(count(&conn, "book_category"), 0);
    assert!(books.find_by_id(1).unwrap().is_none());
}

#[test]
fn create_with_unknown_author_is_rejected_by_foreign_key() {
    let conn = open_db_in_memory().unwrap();
    let fx = seed(&conn);
    let books = SqliteBookRepository::try_new(&conn).unwrap();

    let err = books
        .create(&BookDraft::new("Ghost", 1999), &[999], &[fx.fantasy])
        .unwrap_err();
    assert!(err.is_constraint_violation());
    assert_eq!(books.count().unwrap(), 0);
}

#[test]
fn update_authors_fully_replaces_and_reorders() {
    let conn = open_db_in_memory().unwrap();
    let fx = seed(&conn);
    let books = SqliteBookRepository::try_new(&conn).unwrap();
    let book = books
        .create(
            &BookDraft::new("Good Omens", 1990),
            &[fx.first_author, fx.second_author],
            &[],
        )
        .unwrap();

    books
        .update_authors(book.id, &[fx.second_author, fx.first_author])
        .unwrap();
    let reordered = books.find_by_id(book.id).unwrap().unwrap();
    assert_eq!(
        reordered.author_ids(),
        vec![fx.second_author, fx.first_author]
    );
    assert_eq!(reordered.authors[0].order, 1);
    assert_eq!(reordered.authors[1].order, 2);
    assert!(reordered.updated_at >= book.updated_at);

    books.update_authors(book.id, &[fx.first_author]).unwrap();
    let narrowed = books.find_by_id(book.id).unwrap().unwrap();
    assert_eq!(narrowed.author_ids(), vec![fx.first_author]);
    assert_eq!(count(&conn, "book_author"), 1);
}

#[test]
fn failed_association_replacement_keeps_previous_set() {
    let conn = open_db_in_memory().unwrap();
    let fx = seed(&conn);
    let books = SqliteBookRepository::try_new(&conn).unwrap();
    let book = books
        .create(
            &BookDraft::new("Good Omens", 1990),
            &[fx.first_author],
            &[fx.fantasy],
        )
        .unwrap();

    let err = books
        .update_authors(book.id, &[fx.second_author, fx.second_author])
        .unwrap_err();
    assert!(err.is_constraint_violation());
    let after_authors = books.find_by_id(book.id).unwrap().unwrap();
    assert_eq!(after_authors.author_ids(), vec![fx.first_author]);
    assert_eq!(after_authors.updated_at, book.updated_at);

    books
        .update_categories(book.id, &[fx.classic, 12345])
        .unwrap_err();
    let after_categories = books.find_by_id(book.id).unwrap().unwrap();
    assert_eq!(after_categories.category_ids(), vec![fx.fantasy]);
}

#[test]
fn association_replacement_on_missing_book_is_not_found() {
    let conn = open_db_in_memory().unwrap();
    let fx = seed(&conn);
    let books = SqliteBookRepository::try_new(&conn).unwrap();

    assert!(matches!(
        books.update_authors(77, &[fx.first_author]).unwrap_err(),
        RepoError::NotFound {
            entity: "book",
            id: 77
        }
    ));
    assert!(matches!(
        books.update_categories(77, &[]).unwrap_err(),
        RepoError::NotFound { entity: "book", .. }
    ));
}

#[test]
fn update_categories_can_clear_the_set() {
    let conn = open_db_in_memory().unwrap();
    let fx = seed(&conn);
    let books = SqliteBookRepository::try_new(&conn).unwrap();
    let book = books
        .create(
            &BookDraft::new("Mort", 1987),
            &[fx.first_author],
            &[fx.fantasy, fx.classic],
        )
        .unwrap();

    books.update_categories(book.id, &[]).unwrap();
    assert!(books
        .find_by_id(book.id)
        .unwrap()
        .unwrap()
        .categories
        .is_empty());
    assert_eq!(books.count_by_category_id(fx.fantasy).unwrap(), 0);
}

#[test]
fn update_replaces_scalars_and_keeps_associations() {
    let conn = open_db_in_memory().unwrap();
    let fx = seed(&conn);
    let books = SqliteBookRepository::try_new(&conn).unwrap();
    let book = books
        .create(
            &BookDraft::new("Mort", 1987).with_publisher("Gollancz"),
            &[fx.first_author],
            &[fx.fantasy],
        )
        .unwrap();

    let updated = books
        .update(book.id, &BookDraft::new("Mort (Discworld 4)", 1987).with_pages(320))
        .unwrap();
    assert_eq!(updated.title, "Mort (Discworld 4)");
    assert_eq!(updated.publisher, None);
    assert_eq!(updated.pages, 320);
    assert_eq!(updated.author_ids(), vec![fx.first_author]);
    assert_eq!(updated.category_ids(), vec![fx.fantasy]);

    assert!(matches!(
        books.update(999, &BookDraft::new("None", 1)).unwrap_err(),
        RepoError::NotFound { entity: "book", id: 999 }
    ));
}

#[test]
fn deleting_a_book_cascades_to_quotes_and_associations() {
    let conn = open_db_in_memory().unwrap();
    let fx = seed(&conn);
    let books = SqliteBookRepository::try_new(&conn).unwrap();
    let quotes = SqliteQuoteRepository::try_new(&conn).unwrap();
    let book = books
        .create(
            &BookDraft::new("Small Gods", 1992),
            &[fx.first_author, fx.second_author],
            &[fx.fantasy],
        )
        .unwrap();
    quotes
        .create(&QuoteDraft::new(book.id, "Gods don't like people not doing much work."))
        .unwrap();

    books.delete(book.id).unwrap();

    assert_eq!(quotes.count().unwrap(), 0);
    assert!(quotes.find_by_book_id(book.id, 10, 0).unwrap().is_empty());
    assert_eq!(count(&conn, "book_author"), 0);
    assert_eq!(count(&conn, "book_category"), 0);
    assert_eq!(count(&conn, "author"), 2);
    assert!(matches!(
        books.delete(book.id).unwrap_err(),
        RepoError::NotFound { .. }
    ));
}

#[test]
fn isbn_is_unique_but_missing_isbns_may_repeat() {
    let conn = open_db_in_memory().unwrap();
    let fx = seed(&conn);
    let books = SqliteBookRepository::try_new(&conn).unwrap();

    books
        .create(
            &BookDraft::new("Guards! Guards!", 1989).with_isbn("0575046066"),
            &[fx.first_author],
            &[],
        )
        .unwrap();
    let err = books
        .create(
            &BookDraft::new("Copy", 1989).with_isbn("0575046066"),
            &[fx.first_author],
            &[],
        )
        .unwrap_err();
    assert!(err.is_constraint_violation());

    books
        .create(&BookDraft::new("No isbn one", 1990), &[fx.first_author], &[])
        .unwrap();
    books
        .create(&BookDraft::new("No isbn two", 1991), &[fx.first_author], &[])
        .unwrap();
    assert_eq!(books.count().unwrap(), 3);
    assert_eq!(
        books.find_by_isbn("0575046066").unwrap().unwrap().title,
        "Guards! Guards!"
    );
}

#[test]
fn lookups_by_author_and_category_page_with_matching_counts() {
    let conn = open_db_in_memory().unwrap();
    let fx = seed(&conn);
    let books = SqliteBookRepository::try_new(&conn).unwrap();
    for (title, authors) in [
        ("Sourcery", vec![fx.first_author]),
        ("Good Omens", vec![fx.first_author, fx.second_author]),
        ("Coraline", vec![fx.second_author]),
        ("Eric", vec![fx.first_author]),
    ] {
        books
            .create(&BookDraft::new(title, 2000), &authors, &[fx.fantasy])
            .unwrap();
    }

    let titles: Vec<String> = books
        .find_by_author_id(fx.first_author, 10, 0)
        .unwrap()
        .into_iter()
        .map(|book| book.title)
        .collect();
    assert_eq!(titles, ["Eric", "Good Omens", "Sourcery"]);
    assert_eq!(books.count_by_author_id(fx.first_author).unwrap(), 3);
    assert_eq!(books.find_by_author_id(fx.first_author, 2, 2).unwrap().len(), 1);

    assert_eq!(books.count_by_category_id(fx.fantasy).unwrap(), 4);
    assert_eq!(books.count_by_category_id(fx.classic).unwrap(), 0);

    assert_eq!(books.search("OMEN", 10, 0).unwrap().len(), 1);
    assert_eq!(books.count_search("o").unwrap(), 3);
}

#[test]
fn best_effort_enrichment_degrades_to_empty_authors() {
    let conn = open_db_in_memory().unwrap();
    let fx = seed(&conn);
    let books = SqliteBookRepository::try_new(&conn).unwrap();
    let book = books
        .create(
            &BookDraft::new("Hogfather", 1996),
            &[fx.first_author],
            &[fx.fantasy],
        )
        .unwrap();
    conn.execute(
        "UPDATE author SET created_at = ?1 WHERE id = ?2;",
        rusqlite::params![i64::MAX, fx.first_author],
    )
    .unwrap();

    let degraded = books.find_by_id(book.id).unwrap().unwrap();
    assert!(degraded.authors.is_empty());
    assert_eq!(degraded.category_ids(), vec![fx.fantasy]);

    let strict = SqliteBookRepository::try_new(&conn)
        .unwrap()
        .with_enrichment(EnrichmentPolicy::Strict);
    assert_eq!(strict.enrichment(), EnrichmentPolicy::Strict);
    assert!(matches!(
        strict.find_by_id(book.id).unwrap_err(),
        RepoError::InvalidData(_)
    ));
}

#[test]
fn book_serializes_with_flattened_author_entries() {
    let conn = open_db_in_memory().unwrap();
    let fx = seed(&conn);
    let books = SqliteBookRepository::try_new(&conn).unwrap();
    let book = books
        .create(&BookDraft::new("Jingo", 1997), &[fx.first_author], &[])
        .unwrap();

    let json = serde_json::to_value(&book).unwrap();
    assert_eq!(json["title"], "Jingo");
    assert_eq!(json["authors"][0]["name"], "Terry Pratchett");
    assert_eq!(json["authors"][0]["order"], 1);
    assert!(json["categories"].as_array().unwrap().is_empty());
}
