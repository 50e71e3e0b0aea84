use crate::{
    multipart::{Entries, Keys, Values},
    Value,
};

/// The operations of a browser `FormData`, for code that wants to accept any
/// form-like container.
pub trait FormData {
    const TAG: &'static str = "FormData";

    fn append(&mut self, name: &str, value: Value, filename: Option<&str>) -> &mut Self;

    fn set(&mut self, name: &str, value: Value, filename: Option<&str>) -> &mut Self;

    fn delete(&mut self, name: &str) -> &mut Self;

    fn get(&self, name: &str) -> Option<&Value>;

    fn get_all(&self, name: &str) -> Vec<&Value>;

    fn has(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    fn entries(&self) -> Entries<'_>;

    fn keys(&self) -> Keys<'_>;

    fn values(&self) -> Values<'_>;
}
