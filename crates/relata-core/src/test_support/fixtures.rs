use crate::{
    db::relation::{LazyList, RelationBinder},
    error::InternalError,
    model::{EntityDecl, FieldDecl, KeyGeneration},
    test_support::{test_entity, unknown_column},
    traits::{Entity, EntityRow, FieldValue, assign},
    value::Value,
};
use ulid::Ulid;

///
/// SCHEMA
///

pub(crate) const SCHEMA: &str = "
CREATE TABLE People (Id INTEGER PRIMARY KEY AUTOINCREMENT, Name TEXT NOT NULL, Age INTEGER NOT NULL, Nick TEXT);
CREATE TABLE Categories (Id INTEGER PRIMARY KEY AUTOINCREMENT, Name TEXT NOT NULL);
CREATE TABLE Books (Id INTEGER PRIMARY KEY AUTOINCREMENT, Title TEXT NOT NULL, Category_Id INTEGER NOT NULL, Quantity INTEGER NOT NULL);
CREATE TABLE LockVersionTest (Id INTEGER PRIMARY KEY AUTOINCREMENT, Name TEXT NOT NULL, LockVersion INTEGER NOT NULL);
CREATE TABLE CountTable (Id INTEGER PRIMARY KEY AUTOINCREMENT, Name TEXT NOT NULL, [Count] INTEGER NOT NULL);
CREATE TABLE File (BelongsTo_Id INTEGER NOT NULL);
CREATE TABLE MKEY (FirstName TEXT NOT NULL, LastName TEXT NOT NULL, Age INTEGER NOT NULL, PRIMARY KEY (FirstName, LastName));
CREATE TABLE Tokens (Id TEXT PRIMARY KEY, Label TEXT NOT NULL);
CREATE TABLE Members (Id INTEGER PRIMARY KEY AUTOINCREMENT, Email TEXT NOT NULL, Name TEXT NOT NULL);
CREATE TABLE Articles (Id INTEGER PRIMARY KEY AUTOINCREMENT, Title TEXT NOT NULL);
CREATE TABLE Readers (Id INTEGER PRIMARY KEY AUTOINCREMENT, Name TEXT NOT NULL);
CREATE TABLE Article_Reader (ArticleId INTEGER NOT NULL, ReaderId INTEGER NOT NULL);
";

/// Ten people, ids 1..=10, ages 21..=30.
pub(crate) const SEED_PEOPLE: &str = "
INSERT INTO People (Name, Age, Nick) VALUES ('Tom', 21, NULL);
INSERT INTO People (Name, Age, Nick) VALUES ('Jerry', 22, 'mouse');
INSERT INTO People (Name, Age, Nick) VALUES ('Mike', 23, NULL);
INSERT INTO People (Name, Age, Nick) VALUES ('Anna', 24, NULL);
INSERT INTO People (Name, Age, Nick) VALUES ('Bob', 25, 'bobby');
INSERT INTO People (Name, Age, Nick) VALUES ('Carl', 26, NULL);
INSERT INTO People (Name, Age, Nick) VALUES ('Dora', 27, NULL);
INSERT INTO People (Name, Age, Nick) VALUES ('Eve', 28, NULL);
INSERT INTO People (Name, Age, Nick) VALUES ('Finn', 29, NULL);
INSERT INTO People (Name, Age, Nick) VALUES ('Gina', 30, NULL);
";

/// Categories 1..=3; books 1..=5 in categories 2, 2, 2, 3, 3.
pub(crate) const SEED_BOOKS: &str = "
INSERT INTO Categories (Name) VALUES ('Empty');
INSERT INTO Categories (Name) VALUES ('Fiction');
INSERT INTO Categories (Name) VALUES ('Science');
INSERT INTO Books (Title, Category_Id, Quantity) VALUES ('Dune', 2, 1);
INSERT INTO Books (Title, Category_Id, Quantity) VALUES ('Emma', 2, 2);
INSERT INTO Books (Title, Category_Id, Quantity) VALUES ('Ulysses', 2, 3);
INSERT INTO Books (Title, Category_Id, Quantity) VALUES ('Cosmos', 3, 4);
INSERT INTO Books (Title, Category_Id, Quantity) VALUES ('Gaia', 3, 6);
";

/// Twelve rows over nine distinct values.
pub(crate) const SEED_FILES: &str = "
INSERT INTO File (BelongsTo_Id) VALUES (0), (1), (1), (2), (3), (3), (4), (9), (11), (11), (15), (16);
";

/// Articles 1..=2, readers 1..=3; article 1 is read by readers 3 and 1.
pub(crate) const SEED_ARTICLES: &str = "
INSERT INTO Articles (Title) VALUES ('Rust'), ('SQL');
INSERT INTO Readers (Name) VALUES ('Ada'), ('Brian'), ('Cleo');
INSERT INTO Article_Reader (ArticleId, ReaderId) VALUES (1, 3), (1, 1), (2, 2);
";

// ----- Plain tables -----

test_entity! {
    Person,
    decl = EntityDecl::new("Person")
        .table("People")
        .field(FieldDecl::of::<i64>("Id").key(KeyGeneration::Database))
        .field(FieldDecl::of::<String>("theName").column("Name"))
        .field(FieldDecl::of::<i64>("Age"))
        .field(FieldDecl::of::<Option<String>>("Nick").allow_null()),
    fields = [
        id: i64 => "Id",
        name: String => "theName",
        age: i64 => "Age",
        nick: Option<String> => "Nick",
    ],
}

test_entity! {
    Book,
    decl = EntityDecl::new("Book")
        .table("Books")
        .field(FieldDecl::of::<i64>("Id").key(KeyGeneration::Database))
        .field(FieldDecl::of::<String>("Title"))
        .field(FieldDecl::of::<i64>("CategoryId").column("Category_Id"))
        .field(FieldDecl::of::<i64>("Quantity")),
    fields = [
        id: i64 => "Id",
        title: String => "Title",
        category_id: i64 => "CategoryId",
        quantity: i64 => "Quantity",
    ],
}

test_entity! {
    Versioned,
    decl = EntityDecl::new("Versioned")
        .table("LockVersionTest")
        .field(FieldDecl::of::<i64>("Id").key(KeyGeneration::Database))
        .field(FieldDecl::of::<String>("Name"))
        .field(FieldDecl::of::<i64>("LockVersion").lock_version()),
    fields = [
        id: i64 => "Id",
        name: String => "Name",
        lock_version: i64 => "LockVersion",
    ],
}

test_entity! {
    Counted,
    decl = EntityDecl::new("Counted")
        .table("CountTable")
        .field(FieldDecl::of::<i64>("Id").key(KeyGeneration::Database))
        .field(FieldDecl::of::<String>("Name"))
        .field(FieldDecl::of::<i64>("Count").counter()),
    fields = [
        id: i64 => "Id",
        name: String => "Name",
        count: i64 => "Count",
    ],
}

test_entity! {
    FileEntry,
    decl = EntityDecl::new("FileEntry")
        .table("File")
        .field(FieldDecl::of::<i64>("BelongsToId").column("BelongsTo_Id")),
    fields = [
        belongs_to_id: i64 => "BelongsToId",
    ],
}

test_entity! {
    FullName,
    decl = EntityDecl::new("FullName")
        .table("MKEY")
        .field(FieldDecl::of::<String>("FirstName").key(KeyGeneration::Supplied))
        .field(FieldDecl::of::<String>("LastName").key(KeyGeneration::Supplied))
        .field(FieldDecl::of::<i64>("Age")),
    fields = [
        first_name: String => "FirstName",
        last_name: String => "LastName",
        age: i64 => "Age",
    ],
}

test_entity! {
    Token,
    decl = EntityDecl::new("Token")
        .table("Tokens")
        .field(FieldDecl::of::<Ulid>("Id").key(KeyGeneration::Ulid))
        .field(FieldDecl::of::<String>("Label")),
    fields = [
        id: Ulid => "Id",
        label: String => "Label",
    ],
}

test_entity! {
    Member,
    decl = EntityDecl::new("Member")
        .table("Members")
        .field(FieldDecl::of::<i64>("Id").key(KeyGeneration::Database))
        .field(FieldDecl::of::<String>("Email").unique())
        .field(FieldDecl::of::<String>("Name").max_length(8)),
    fields = [
        id: i64 => "Id",
        email: String => "Email",
        name: String => "Name",
    ],
}

test_entity! {
    Reader,
    decl = EntityDecl::new("Reader")
        .table("Readers")
        .field(FieldDecl::of::<i64>("Id").key(KeyGeneration::Database))
        .field(FieldDecl::of::<String>("Name")),
    fields = [
        id: i64 => "Id",
        name: String => "Name",
    ],
}

// ----- Relation owners -----

///
/// Category
///
/// Owns its books through `Books.Category_Id`; loaded lazily.
///

#[derive(Debug, Default)]
pub(crate) struct Category {
    pub(crate) id: i64,
    pub(crate) name: String,
    pub(crate) books: LazyList<Book>,
}

impl Entity for Category {
    fn declare() -> EntityDecl {
        EntityDecl::new("Category")
            .table("Categories")
            .field(FieldDecl::of::<i64>("Id").key(KeyGeneration::Database))
            .field(FieldDecl::of::<String>("Name"))
            .field(FieldDecl::has_many::<Book>("Books", "CategoryId").lazy())
    }

    fn values(&self) -> Vec<Value> {
        vec![self.id.to_value(), self.name.to_value()]
    }

    fn from_row(row: &EntityRow<'_>) -> Result<Self, InternalError> {
        Ok(Self {
            id: row.get("Id")?,
            name: row.get("Name")?,
            books: LazyList::new(),
        })
    }

    fn set_value(&mut self, column: &str, value: &Value) -> Result<(), InternalError> {
        match column {
            "Id" => assign(&mut self.id, column, value),
            "Name" => assign(&mut self.name, column, value),
            _ => Err(unknown_column("Category", column)),
        }
    }

    fn bind_relations(&mut self, binder: &RelationBinder<'_>) -> Result<(), InternalError> {
        binder.bind("Books", &mut self.books)
    }
}

///
/// Article
///
/// Readers through the `Article_Reader` junction; loaded with the article.
///

#[derive(Debug, Default)]
pub(crate) struct Article {
    pub(crate) id: i64,
    pub(crate) title: String,
    pub(crate) readers: LazyList<Reader>,
}

impl Entity for Article {
    fn declare() -> EntityDecl {
        EntityDecl::new("Article")
            .table("Articles")
            .field(FieldDecl::of::<i64>("Id").key(KeyGeneration::Database))
            .field(FieldDecl::of::<String>("Title"))
            .field(FieldDecl::many_to_many::<Reader>(
                "Readers",
                "Article_Reader",
                "ArticleId",
                "ReaderId",
            ))
    }

    fn values(&self) -> Vec<Value> {
        vec![self.id.to_value(), self.title.to_value()]
    }

    fn from_row(row: &EntityRow<'_>) -> Result<Self, InternalError> {
        Ok(Self {
            id: row.get("Id")?,
            title: row.get("Title")?,
            readers: LazyList::new(),
        })
    }

    fn set_value(&mut self, column: &str, value: &Value) -> Result<(), InternalError> {
        match column {
            "Id" => assign(&mut self.id, column, value),
            "Title" => assign(&mut self.title, column, value),
            _ => Err(unknown_column("Article", column)),
        }
    }

    fn bind_relations(&mut self, binder: &RelationBinder<'_>) -> Result<(), InternalError> {
        binder.bind("Readers", &mut self.readers)
    }
}

///
/// Post / Subscriber
///
/// The article and reader tables again, each declaring the junction toward
/// the other, both eager.
///

#[derive(Debug, Default)]
pub(crate) struct Post {
    pub(crate) id: i64,
    pub(crate) title: String,
    pub(crate) subscribers: LazyList<Subscriber>,
}

impl Entity for Post {
    fn declare() -> EntityDecl {
        EntityDecl::new("Post")
            .table("Articles")
            .field(FieldDecl::of::<i64>("Id").key(KeyGeneration::Database))
            .field(FieldDecl::of::<String>("Title"))
            .field(FieldDecl::many_to_many::<Subscriber>(
                "Subscribers",
                "Article_Reader",
                "ArticleId",
                "ReaderId",
            ))
    }

    fn values(&self) -> Vec<Value> {
        vec![self.id.to_value(), self.title.to_value()]
    }

    fn from_row(row: &EntityRow<'_>) -> Result<Self, InternalError> {
        Ok(Self {
            id: row.get("Id")?,
            title: row.get("Title")?,
            subscribers: LazyList::new(),
        })
    }

    fn set_value(&mut self, column: &str, value: &Value) -> Result<(), InternalError> {
        match column {
            "Id" => assign(&mut self.id, column, value),
            "Title" => assign(&mut self.title, column, value),
            _ => Err(unknown_column("Post", column)),
        }
    }

    fn bind_relations(&mut self, binder: &RelationBinder<'_>) -> Result<(), InternalError> {
        binder.bind("Subscribers", &mut self.subscribers)
    }
}

#[derive(Debug, Default)]
pub(crate) struct Subscriber {
    pub(crate) id: i64,
    pub(crate) name: String,
    pub(crate) posts: LazyList<Post>,
}

impl Entity for Subscriber {
    fn declare() -> EntityDecl {
        EntityDecl::new("Subscriber")
            .table("Readers")
            .field(FieldDecl::of::<i64>("Id").key(KeyGeneration::Database))
            .field(FieldDecl::of::<String>("Name"))
            .field(FieldDecl::many_to_many::<Post>(
                "Posts",
                "Article_Reader",
                "ReaderId",
                "ArticleId",
            ))
    }

    fn values(&self) -> Vec<Value> {
        vec![self.id.to_value(), self.name.to_value()]
    }

    fn from_row(row: &EntityRow<'_>) -> Result<Self, InternalError> {
        Ok(Self {
            id: row.get("Id")?,
            name: row.get("Name")?,
            posts: LazyList::new(),
        })
    }

    fn set_value(&mut self, column: &str, value: &Value) -> Result<(), InternalError> {
        match column {
            "Id" => assign(&mut self.id, column, value),
            "Name" => assign(&mut self.name, column, value),
            _ => Err(unknown_column("Subscriber", column)),
        }
    }

    fn bind_relations(&mut self, binder: &RelationBinder<'_>) -> Result<(), InternalError> {
        binder.bind("Posts", &mut self.posts)
    }
}

// ----- Constructors -----

pub(crate) fn person(name: &str, age: i64) -> Person {
    Person {
        name: name.to_string(),
        age,
        ..Person::default()
    }
}

pub(crate) fn book(title: &str, category_id: i64, quantity: i64) -> Book {
    Book {
        title: title.to_string(),
        category_id,
        quantity,
        ..Book::default()
    }
}
