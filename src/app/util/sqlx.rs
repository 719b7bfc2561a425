use std::borrow::Cow;

#[non_exhaustive]
pub struct SqlStateCodes;

impl SqlStateCodes {
    pub const UNDEFINED_TABLE: &str = "42P01";
    pub const STRING_DATA_RIGHT_TRUNCATION: &str = "22001";
}

pub fn get_code_from_err(err: &sqlx::Error) -> Option<String> {
    let db_err = err.as_database_error()?;

    match db_err.code() {
        Some(code) => match code {
            Cow::Borrowed(val) => Some(val.to_owned()),
            Cow::Owned(val) => Some(val),
        },
        None => None,
    }
}
