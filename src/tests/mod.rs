mod common;

mod test_common_validation;
