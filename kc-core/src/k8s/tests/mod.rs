mod selector_test;
mod util_test;

use kc_testutils::*;

use super::*;
use crate::macros::*;
