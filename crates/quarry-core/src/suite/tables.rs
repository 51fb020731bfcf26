/// The eight TPC-H source tables, keyed by their query placeholder.
pub const TPCH_TABLES: [(&str, &str); 8] = [
    ("LINEITEM_TABLE", "lineitem"),
    ("CUSTOMER_TABLE", "customer"),
    ("ORDERS_TABLE", "orders"),
    ("PART_TABLE", "part"),
    ("SUPPLIER_TABLE", "supplier"),
    ("PARTSUPP_TABLE", "partsupp"),
    ("NATION_TABLE", "nation"),
    ("REGION_TABLE", "region"),
];

/// How table placeholders are rendered for a backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableNaming {
    /// Bare names, resolved against the session's current schema.
    Bare,
    /// `<database>.<schema>.<table>`.
    Qualified { database: String, schema: String },
    /// Snowflake's shared `SNOWFLAKE_SAMPLE_DATA.TPCH_SF<n>` schemas.
    SampleData { scale_factor: u32 },
}

impl TableNaming {
    /// Picks the closest shared sample schema for a dataset path such as `tpch/10`.
    pub fn sample_data_for(dataset_path: &str) -> Self {
        let scale = dataset_path
            .split('/')
            .nth(1)
            .map(|s| s.trim_start_matches('0'))
            .and_then(|s| if s.is_empty() { Some(1) } else { s.parse::<u32>().ok() })
            .unwrap_or(1);

        let scale_factor = match scale {
            s if s >= 1000 => 1000,
            s if s >= 100 => 100,
            s if s >= 10 => 10,
            _ => 1,
        };
        TableNaming::SampleData { scale_factor }
    }

    pub fn table_name(&self, table: &str) -> String {
        match self {
            TableNaming::Bare => table.to_string(),
            TableNaming::Qualified { database, schema } => {
                format!("{}.{}.{}", database, schema, table)
            }
            TableNaming::SampleData { scale_factor } => {
                format!("SNOWFLAKE_SAMPLE_DATA.TPCH_SF{}.{}", scale_factor, table)
            }
        }
    }

    /// Replaces every `{PLACEHOLDER}` in `sql`.
    pub fn apply(&self, sql: &str) -> String {
        let mut out = sql.to_string();
        for (placeholder, table) in TPCH_TABLES {
            out = out.replace(&format!("{{{}}}", placeholder), &self.table_name(table));
        }
        out
    }
}
