//! The fixed, ordered workload catalogue
//!
//! Names and order are the external contract of every report: suites are
//! compared row by row on catalogue position.

use std::fmt;

use serde::{Serialize, Serializer};

/// Row counts of the JSON workload pairs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JsonScale {
    Small,
    Medium,
    Large,
}

impl JsonScale {
    pub fn rows(self) -> usize {
        match self {
            JsonScale::Small => 1_000,
            JsonScale::Medium => 5_000,
            JsonScale::Large => 25_000,
        }
    }
}

/// One step of a JSON workload pair
///
/// The select steps read back the rows the [`JsonStep::Insert`] step of the
/// same scale wrote, so they cannot run on their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JsonStep {
    Insert,
    Select,
    SelectParsed,
}

/// A named entry of the catalogue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TestCase {
    Inserts,
    InsertsInTransaction,
    IndexedInserts,
    UnindexedSelects,
    StringSelects,
    IndexedSelects,
    UnindexedUpdates,
    IndexedUpdates,
    TextUpdates,
    InsertFromSelect,
    UnindexedDelete,
    IndexedDelete,
    BigInsertAfterDelete,
    DeleteThenInserts,
    ClearTables,
    LargeScan,
    Json(JsonScale, JsonStep),
}

impl TestCase {
    /// Every test in report order
    pub const ALL: [TestCase; 25] = [
        TestCase::Inserts,
        TestCase::InsertsInTransaction,
        TestCase::IndexedInserts,
        TestCase::UnindexedSelects,
        TestCase::StringSelects,
        TestCase::IndexedSelects,
        TestCase::UnindexedUpdates,
        TestCase::IndexedUpdates,
        TestCase::TextUpdates,
        TestCase::InsertFromSelect,
        TestCase::UnindexedDelete,
        TestCase::IndexedDelete,
        TestCase::BigInsertAfterDelete,
        TestCase::DeleteThenInserts,
        TestCase::ClearTables,
        TestCase::LargeScan,
        TestCase::Json(JsonScale::Small, JsonStep::Insert),
        TestCase::Json(JsonScale::Small, JsonStep::Select),
        TestCase::Json(JsonScale::Small, JsonStep::SelectParsed),
        TestCase::Json(JsonScale::Medium, JsonStep::Insert),
        TestCase::Json(JsonScale::Medium, JsonStep::Select),
        TestCase::Json(JsonScale::Medium, JsonStep::SelectParsed),
        TestCase::Json(JsonScale::Large, JsonStep::Insert),
        TestCase::Json(JsonScale::Large, JsonStep::Select),
        TestCase::Json(JsonScale::Large, JsonStep::SelectParsed),
    ];

    pub fn name(&self) -> &'static str {
        use JsonScale::*;
        use JsonStep::*;

        match self {
            TestCase::Inserts => "Test 1: 1000 INSERTs",
            TestCase::InsertsInTransaction => "Test 2: 25000 INSERTs in a transaction",
            TestCase::IndexedInserts => "Test 3: 25000 INSERTs into an indexed table",
            TestCase::UnindexedSelects => "Test 4: 100 SELECTs without an index",
            TestCase::StringSelects => "Test 5: 100 SELECTs on a string comparison",
            TestCase::IndexedSelects => "Test 6: 5000 SELECTs with an index",
            TestCase::UnindexedUpdates => "Test 7: 1000 UPDATEs without an index",
            TestCase::IndexedUpdates => "Test 8: 25000 UPDATEs with an index",
            TestCase::TextUpdates => "Test 9: 25000 text UPDATEs with an index",
            TestCase::InsertFromSelect => "Test 10: INSERTs from a SELECT",
            TestCase::UnindexedDelete => "Test 11: DELETE without an index",
            TestCase::IndexedDelete => "Test 12: DELETE with an index",
            TestCase::BigInsertAfterDelete => "Test 13: A big INSERT after a big DELETE",
            TestCase::DeleteThenInserts => "Test 14: A big DELETE followed by many small INSERTs",
            TestCase::ClearTables => "Test 15: Clear table",
            TestCase::LargeScan => "Test 16: Scan the large dataset table",
            TestCase::Json(Small, Insert) => "Test 17a: 1000 JSON INSERTs",
            TestCase::Json(Small, Select) => "Test 17b: 1000 JSON SELECTs",
            TestCase::Json(Small, SelectParsed) => "Test 17c: 1000 JSON SELECTs with parsing",
            TestCase::Json(Medium, Insert) => "Test 18a: 5000 JSON INSERTs",
            TestCase::Json(Medium, Select) => "Test 18b: 5000 JSON SELECTs",
            TestCase::Json(Medium, SelectParsed) => "Test 18c: 5000 JSON SELECTs with parsing",
            TestCase::Json(Large, Insert) => "Test 19a: 25000 JSON INSERTs",
            TestCase::Json(Large, Select) => "Test 19b: 25000 JSON SELECTs",
            TestCase::Json(Large, SelectParsed) => "Test 19c: 25000 JSON SELECTs with parsing",
        }
    }

    /// Zero-based row of this test in a comparison table
    pub fn position(&self) -> usize {
        Self::ALL
            .iter()
            .position(|case| case == self)
            .unwrap_or(Self::ALL.len())
    }

    /// Test that must run earlier in the same suite for this one to have data
    pub fn prerequisite(&self) -> Option<TestCase> {
        match self {
            TestCase::Json(scale, JsonStep::Select | JsonStep::SelectParsed) => {
                Some(TestCase::Json(*scale, JsonStep::Insert))
            }
            _ => None,
        }
    }

    /// Only run when explicitly requested
    pub fn is_optional(&self) -> bool {
        matches!(self, TestCase::LargeScan)
    }

    /// Dominated by many independent parameterised statements, so the
    /// batched variant replaces its body with one batch call
    pub fn is_batch_dependent(&self) -> bool {
        matches!(
            self,
            TestCase::InsertsInTransaction
                | TestCase::IndexedInserts
                | TestCase::IndexedUpdates
                | TestCase::TextUpdates
                | TestCase::DeleteThenInserts
        )
    }

    /// Short id such as `7` or `17b`
    pub fn label(&self) -> &'static str {
        let name = self.name();
        name.strip_prefix("Test ")
            .and_then(|rest| rest.split(':').next())
            .unwrap_or(name)
    }

    /// Look a test up by full name or by label
    pub fn find(name: &str) -> Option<TestCase> {
        let name = name.trim();
        Self::ALL
            .into_iter()
            .find(|case| case.name() == name || case.label().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for TestCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Serialize for TestCase {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

/// Tests a run executes, in order
pub fn catalogue(include_large_dataset: bool) -> Vec<TestCase> {
    TestCase::ALL
        .into_iter()
        .filter(|case| include_large_dataset || !case.is_optional())
        .collect()
}
