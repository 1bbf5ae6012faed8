//! Read-only SQL behind each diagnostic.
//!
//! Every diagnostic query binds the target schema as `$1` and reads
//! `pg_catalog` relations only. Result columns are aliased to the names
//! the row mappers expect, and rows are ordered by object name so output
//! is stable across runs. The grouping queries emit their members in the
//! `idx=<name>, size=<bytes>` descriptor format, entries joined by `"; "`.

pub const INVALID_INDEXES: &str = r#"
SELECT c.relname::text  AS table_name,
       ci.relname::text AS index_name
FROM pg_catalog.pg_index x
         JOIN pg_catalog.pg_class c ON c.oid = x.indrelid
         JOIN pg_catalog.pg_class ci ON ci.oid = x.indexrelid
         JOIN pg_catalog.pg_namespace n ON n.oid = c.relnamespace
WHERE n.nspname = $1::text
  AND NOT x.indisvalid
ORDER BY table_name, index_name"#;

pub const DUPLICATED_INDEXES: &str = r#"
SELECT c.relname::text AS table_name,
       string_agg('idx=' || ci.relname || ', size=' || pg_relation_size(x.indexrelid),
                  '; ' ORDER BY ci.relname) AS grouped_indexes
FROM pg_catalog.pg_index x
         JOIN pg_catalog.pg_class c ON c.oid = x.indrelid
         JOIN pg_catalog.pg_class ci ON ci.oid = x.indexrelid
         JOIN pg_catalog.pg_namespace n ON n.oid = c.relnamespace
WHERE n.nspname = $1::text
GROUP BY c.relname, x.indrelid, x.indclass, x.indkey,
         coalesce(pg_get_expr(x.indexprs, x.indrelid), ''),
         coalesce(pg_get_expr(x.indpred, x.indrelid), '')
HAVING count(*) > 1
ORDER BY table_name"#;

pub const INTERSECTED_INDEXES: &str = r#"
SELECT c.relname::text AS table_name,
       'idx=' || ci1.relname || ', size=' || pg_relation_size(x1.indexrelid) ||
       '; idx=' || ci2.relname || ', size=' || pg_relation_size(x2.indexrelid) AS grouped_indexes
FROM pg_catalog.pg_index x1
         JOIN pg_catalog.pg_index x2
              ON x1.indrelid = x2.indrelid AND x1.indexrelid > x2.indexrelid
         JOIN pg_catalog.pg_class c ON c.oid = x1.indrelid
         JOIN pg_catalog.pg_class ci1 ON ci1.oid = x1.indexrelid
         JOIN pg_catalog.pg_class ci2 ON ci2.oid = x2.indexrelid
         JOIN pg_catalog.pg_namespace n ON n.oid = c.relnamespace
WHERE n.nspname = $1::text
  AND (x1.indkey::text = x2.indkey::text OR
       x1.indkey::text LIKE x2.indkey::text || ' %' OR
       x2.indkey::text LIKE x1.indkey::text || ' %')
ORDER BY table_name, ci1.relname"#;

pub const UNUSED_INDEXES: &str = r#"
SELECT psui.relname::text      AS table_name,
       psui.indexrelname::text AS index_name,
       pg_relation_size(x.indexrelid) AS index_size,
       coalesce(psui.idx_scan, 0)     AS index_scans
FROM pg_catalog.pg_stat_user_indexes psui
         JOIN pg_catalog.pg_index x ON x.indexrelid = psui.indexrelid
WHERE psui.schemaname = $1::text
  AND NOT x.indisunique
  AND coalesce(psui.idx_scan, 0) < 50
ORDER BY table_name, index_name"#;

pub const FOREIGN_KEYS_WITHOUT_INDEX: &str = r#"
SELECT t.relname::text AS table_name,
       con.conname::text AS constraint_name,
       array_agg(col.attname::text ORDER BY u.attposition) AS columns
FROM pg_catalog.pg_constraint con
         JOIN LATERAL unnest(con.conkey) WITH ORDINALITY u(attnum, attposition) ON true
         JOIN pg_catalog.pg_class t ON t.oid = con.conrelid
         JOIN pg_catalog.pg_namespace n ON n.oid = t.relnamespace
         JOIN pg_catalog.pg_attribute col ON col.attrelid = t.oid AND col.attnum = u.attnum
WHERE con.contype = 'f'
  AND n.nspname = $1::text
  AND NOT EXISTS(SELECT 1
                 FROM pg_catalog.pg_index x
                 WHERE x.indrelid = con.conrelid
                   AND con.conkey <@ string_to_array(x.indkey::text, ' ')::int2[]
                   AND array_position(string_to_array(x.indkey::text, ' ')::int2[],
                                      con.conkey[1]) = 1)
GROUP BY t.relname, con.conname
ORDER BY table_name, constraint_name"#;

pub const TABLES_WITH_MISSING_INDEXES: &str = r#"
SELECT psat.relname::text AS table_name,
       pg_table_size(psat.relid)  AS table_size,
       coalesce(psat.seq_scan, 0) AS seq_scans,
       coalesce(psat.idx_scan, 0) AS index_scans
FROM pg_catalog.pg_stat_user_tables psat
WHERE psat.schemaname = $1::text
  AND coalesce(psat.seq_scan, 0) - coalesce(psat.idx_scan, 0) > 100
ORDER BY table_name"#;

pub const TABLES_WITHOUT_PRIMARY_KEY: &str = r#"
SELECT c.relname::text AS table_name,
       pg_table_size(c.oid) AS table_size
FROM pg_catalog.pg_class c
         JOIN pg_catalog.pg_namespace n ON n.oid = c.relnamespace
WHERE c.relkind = 'r'
  AND n.nspname = $1::text
  AND NOT EXISTS(SELECT 1
                 FROM pg_catalog.pg_constraint con
                 WHERE con.conrelid = c.oid
                   AND con.contype = 'p')
ORDER BY table_name"#;

pub const INDEXES_WITH_NULL_VALUES: &str = r#"
SELECT c.relname::text  AS table_name,
       ci.relname::text AS index_name,
       pg_relation_size(x.indexrelid) AS index_size,
       a.attname::text  AS nullable_column
FROM pg_catalog.pg_index x
         JOIN pg_catalog.pg_class c ON c.oid = x.indrelid
         JOIN pg_catalog.pg_class ci ON ci.oid = x.indexrelid
         JOIN pg_catalog.pg_namespace n ON n.oid = c.relnamespace
         JOIN pg_catalog.pg_attribute a
              ON a.attrelid = x.indrelid
                 AND a.attnum = (string_to_array(x.indkey::text, ' ')::int2[])[1]
         JOIN pg_catalog.pg_stats s
              ON s.schemaname = n.nspname
                 AND s.tablename = c.relname
                 AND s.attname = a.attname
WHERE n.nspname = $1::text
  AND NOT x.indisunique
  AND NOT a.attnotnull
  AND x.indpred IS NULL
  AND s.null_frac > 0.5
ORDER BY table_name, index_name"#;

pub const PARAMS_CURRENT_VALUES: &str =
    "SELECT name::text, setting::text FROM pg_catalog.pg_settings ORDER BY name";

pub const PARAMS_AT_STOCK_DEFAULT: &str = r#"
SELECT name::text, setting::text
FROM pg_catalog.pg_settings
WHERE source = 'default'
ORDER BY name"#;

#[cfg(test)]
mod tests {
    use super::*;

    const DIAGNOSTIC_QUERIES: [&str; 8] = [
        INVALID_INDEXES,
        DUPLICATED_INDEXES,
        INTERSECTED_INDEXES,
        UNUSED_INDEXES,
        FOREIGN_KEYS_WITHOUT_INDEX,
        TABLES_WITH_MISSING_INDEXES,
        TABLES_WITHOUT_PRIMARY_KEY,
        INDEXES_WITH_NULL_VALUES,
    ];

    #[test]
    fn diagnostic_queries_bind_the_schema() {
        for sql in DIAGNOSTIC_QUERIES {
            assert!(sql.contains("$1::text"), "schema binding missing in: {sql}");
        }
    }

    #[test]
    fn diagnostic_queries_are_read_only_catalog_reads() {
        for sql in DIAGNOSTIC_QUERIES {
            assert!(sql.trim_start().starts_with("SELECT"), "not a select: {sql}");
            assert!(sql.contains("pg_catalog."), "catalog schema not pinned: {sql}");
            for forbidden in ["INSERT", "UPDATE", "DELETE", "CREATE", "DROP", "ALTER"] {
                assert!(!sql.contains(forbidden), "{forbidden} found in: {sql}");
            }
        }
    }

    #[test]
    fn diagnostic_queries_are_distinct() {
        for (i, a) in DIAGNOSTIC_QUERIES.iter().enumerate() {
            for b in DIAGNOSTIC_QUERIES.iter().skip(i + 1) {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn grouping_queries_emit_the_descriptor_format() {
        for sql in [DUPLICATED_INDEXES, INTERSECTED_INDEXES] {
            assert!(sql.contains("'idx='"), "idx prefix missing in: {sql}");
            assert!(sql.contains("', size='"), "size prefix missing in: {sql}");
            assert!(sql.contains("grouped_indexes"), "alias missing in: {sql}");
        }
    }

    #[test]
    fn settings_queries_read_pg_settings() {
        for sql in [PARAMS_CURRENT_VALUES, PARAMS_AT_STOCK_DEFAULT] {
            assert!(sql.contains("pg_catalog.pg_settings"));
            assert!(!sql.contains("$1"));
        }
    }
}
