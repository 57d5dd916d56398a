//! Question supply for duel rooms
//!
//! The question bank is an external collaborator; rooms only see an ordered,
//! fixed set of questions handed over at creation time.

pub mod bank;

pub use bank::{QuestionBankFile, QuestionSupplier, StaticQuestionBank};
