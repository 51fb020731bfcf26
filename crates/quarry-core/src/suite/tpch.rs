//! The 22 TPC-H queries with `{TABLE}` placeholders, in execution order.

pub const QUERIES: [(u32, &str); 22] = [
    (1, include_str!("../../queries/tpch/q01.sql")),
    (2, include_str!("../../queries/tpch/q02.sql")),
    (3, include_str!("../../queries/tpch/q03.sql")),
    (4, include_str!("../../queries/tpch/q04.sql")),
    (5, include_str!("../../queries/tpch/q05.sql")),
    (6, include_str!("../../queries/tpch/q06.sql")),
    (7, include_str!("../../queries/tpch/q07.sql")),
    (8, include_str!("../../queries/tpch/q08.sql")),
    (9, include_str!("../../queries/tpch/q09.sql")),
    (10, include_str!("../../queries/tpch/q10.sql")),
    (11, include_str!("../../queries/tpch/q11.sql")),
    (12, include_str!("../../queries/tpch/q12.sql")),
    (13, include_str!("../../queries/tpch/q13.sql")),
    (14, include_str!("../../queries/tpch/q14.sql")),
    (15, include_str!("../../queries/tpch/q15.sql")),
    (16, include_str!("../../queries/tpch/q16.sql")),
    (17, include_str!("../../queries/tpch/q17.sql")),
    (18, include_str!("../../queries/tpch/q18.sql")),
    (19, include_str!("../../queries/tpch/q19.sql")),
    (20, include_str!("../../queries/tpch/q20.sql")),
    (21, include_str!("../../queries/tpch/q21.sql")),
    (22, include_str!("../../queries/tpch/q22.sql")),
];
