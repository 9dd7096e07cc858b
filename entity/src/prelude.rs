pub use super::reference_object::Entity as ReferenceObject;
