//! # Domain Services
//!
//! Business rules that span more than one field of an entity.
//!
//! - **membership**: who may create, mutate, leave or delete a chat

pub mod membership;
