//! Core error types.

use thiserror::Error;

/// Errors raised while compiling a schema registry.
///
/// These are always fatal and always returned before a database exists.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// Two fields (concrete, virtual or primary key) share a name.
    #[error("definition conflict, column `{field}` on table `{table}`")]
    AliasConflict { field: String, table: String },

    /// Association kind outside oneToOne, oneToMany, manyToMany.
    #[error(
        "unexpected association `{kind}` on `{table}.{field}`, \
         should be one of oneToOne, oneToMany, manyToMany"
    )]
    UnexpectedAssociation {
        kind: String,
        field: String,
        table: String,
    },

    /// Concrete field type outside the row type domain.
    #[error("invalid row type `{ty}` on `{table}.{field}`")]
    InvalidRowType {
        ty: String,
        field: String,
        table: String,
    },

    /// The same table was registered twice.
    #[error("table `{0}` is registered more than once")]
    DuplicateTable(String),

    /// A virtual field points at a table that was never registered.
    #[error("virtual field `{table}.{field}` targets unknown table `{target}`")]
    UnresolvedAssociation {
        field: String,
        table: String,
        target: String,
    },

    /// A many-to-many virtual field names a local key. Link rows always hold
    /// primary keys.
    #[error(
        "manyToMany virtual field `{table}.{field}` is linked by primary key \
         and cannot declare a local key"
    )]
    LinkedLocalKey { field: String, table: String },

    /// The primary key is not one of the declared concrete fields.
    #[error("primary key `{field}` is not a concrete field of table `{table}`")]
    MissingPrimaryKey { field: String, table: String },
}

/// Errors raised while translating a read.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    /// The operation targets a table that was never compiled.
    #[error("table `{0}` does not exist")]
    NonExistentTable(String),

    /// The projection has no concrete field.
    #[error("invalid field description on `{table}`, only virtual fields are selected")]
    InvalidFieldDescriptor { table: String },
}

/// Errors raised while translating a write.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MutationError {
    /// The patch tries to change the primary key.
    #[error("primary key `{field}` of table `{table}` is not modifiable")]
    UnmodifiablePrimaryKey { field: String, table: String },

    /// A row was inserted without its primary key.
    #[error("row inserted into `{table}` is missing primary key `{field}`")]
    MissingPrimaryKey { field: String, table: String },

    /// An inserted payload is not an object (or array of objects).
    #[error("cannot insert {found} into `{table}`, expected an object")]
    InvalidPayload { table: String, found: &'static str },

    /// A value could not be converted to the field's declared type.
    #[error("invalid value for `{table}.{field}`, expected {expected}")]
    InvalidValue {
        field: String,
        table: String,
        expected: &'static str,
    },

    /// Nested insert went deeper than the configured bound.
    #[error("cascading insert exceeded maximum depth {depth}")]
    CascadeDepthExceeded { depth: usize },
}

/// Core database errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Schema compilation error.
    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),

    /// Query translation error.
    #[error("query error: {0}")]
    Query(#[from] QueryError),

    /// Mutation translation error.
    #[error("mutation error: {0}")]
    Mutation(#[from] MutationError),

    /// The database (or its store) has been disposed.
    #[error("database has been disposed")]
    Disposed,

    /// Backing store failure.
    #[error("store error: {0}")]
    Store(String),
}

/// Convenience result alias.
pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_offender() {
        let err = SchemaError::AliasConflict {
            field: "id".into(),
            table: "Test".into(),
        };
        assert!(err.to_string().contains("`id`"));
        assert!(err.to_string().contains("`Test`"));

        let err = Error::from(QueryError::NonExistentTable("NON_EXISTENT_FOO_TABLE".into()));
        assert!(err.to_string().contains("NON_EXISTENT_FOO_TABLE"));
    }
}
