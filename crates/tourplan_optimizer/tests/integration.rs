mod facade;
mod scenarios;
mod test_utils;
