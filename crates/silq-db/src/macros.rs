//! Macros for declaring table schemas.

/// Defines a module with the table name and typed column constants.
///
/// ```ignore
/// define_entity!(
///     pages {
///         table: "Page",
///         columns: {
///             ID: i64 => "ID",
///             TITLE: String => "Title"
///         }
///     }
/// );
/// ```
///
/// expands to a `pages` module holding `TABLE`, the quoted `TABLE_SQL`, and
/// `ID` / `TITLE` constants qualified with the table name.
#[macro_export]
macro_rules! define_entity {
    (
        $entity:ident {
            table: $table:literal,
            columns: {
                $($col_name:ident: $col_type:ty => $db_col:literal),* $(,)?
            }
        }
    ) => {
        pub mod $entity {
            #[allow(unused_imports)]
            use $crate::expr::column::Col;

            pub const TABLE: &str = $table;
            pub const TABLE_SQL: &str = concat!("\"", $table, "\"");

            $(
                pub const $col_name: Col<$col_type> = Col::qualified($table, $db_col);
            )*
        }
    };
}
