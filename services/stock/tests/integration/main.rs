mod helpers;

mod admin_test;
mod consume_test;
mod http_test;
