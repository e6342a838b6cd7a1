use quotebook_core::db::open_db_in_memory;
use quotebook_core::{
    AuthorDraft, AuthorRepository, BookDraft, BookRepository, CategoryDraft, CategoryRepository,
    RepoError, SqliteAuthorRepository, SqliteBookRepository, SqliteCategoryRepository,
};

#[test]
fn category_crud_round_trip() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteCategoryRepository::try_new(&conn).unwrap();

    let poetry = repo.create(&CategoryDraft::new("Poetry")).unwrap();
    assert_eq!(repo.find_by_id(poetry.id).unwrap().unwrap(), poetry);
    assert_eq!(
        repo.find_by_name("POETRY").unwrap().unwrap().id,
        poetry.id
    );

    let verse = repo.update(poetry.id, &CategoryDraft::new("Verse")).unwrap();
    assert_eq!(verse.name, "Verse");

    repo.delete(poetry.id).unwrap();
    assert!(matches!(
        repo.delete(poetry.id).unwrap_err(),
        RepoError::NotFound {
            entity: "category",
            ..
        }
    ));
}

#[test]
fn duplicate_category_name_is_a_constraint_violation() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteCategoryRepository::try_new(&conn).unwrap();

    repo.create(&CategoryDraft::new("Essays")).unwrap();
    let err = repo.create(&CategoryDraft::new("essays")).unwrap_err();
    assert!(err.is_constraint_violation());
}

#[test]
fn search_and_count_agree() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteCategoryRepository::try_new(&conn).unwrap();
    for name in ["Science Fiction", "Fiction", "History", "Nonfiction"] {
        repo.create(&CategoryDraft::new(name)).unwrap();
    }

    let hits = repo.search("fiction", 2, 0).unwrap();
    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].name, "Fiction");
    assert_eq!(repo.count_search("fiction").unwrap(), 3);
    assert_eq!(repo.search("fiction", 2, 2).unwrap().len(), 1);
}

#[test]
fn find_by_book_id_returns_categories_sorted_by_name() {
    let conn = open_db_in_memory().unwrap();
    let authors = SqliteAuthorRepository::try_new(&conn).unwrap();
    let categories = SqliteCategoryRepository::try_new(&conn).unwrap();
    let books = SqliteBookRepository::try_new(&conn).unwrap();

    let author = authors.create(&AuthorDraft::new("Mary Shelley")).unwrap();
    let horror = categories.create(&CategoryDraft::new("Horror")).unwrap();
    let classic = categories.create(&CategoryDraft::new("Classic")).unwrap();
    let book = books
        .create(
            &BookDraft::new("Frankenstein", 1818),
            &[author.id],
            &[horror.id, classic.id],
        )
        .unwrap();

    let names: Vec<String> = categories
        .find_by_book_id(book.id)
        .unwrap()
        .into_iter()
        .map(|category| category.name)
        .collect();
    assert_eq!(names, ["Classic", "Horror"]);
}
