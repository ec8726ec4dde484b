#![allow(dead_code)]
use chrono::NaiveDate;
use num::rational::BigRational;
use num::BigInt;
use tally::run_app;

pub fn test_args(args: &[&str]) {
    let mut function_args: Vec<&str> = vec!["testing"];
    for arg in args {
        function_args.push(arg);
    }
    function_args.push("--args-only");
    let res = run_app(function_args.iter().map(|x| x.to_string()).collect());
    assert!(res.is_ok());
}

pub fn test_err(args: &[&str]) {
    let mut function_args: Vec<&str> = vec!["testing"];
    for arg in args {
        function_args.push(arg);
    }
    function_args.push("--args-only");
    let res = run_app(function_args.iter().map(|x| x.to_string()).collect());
    assert!(res.is_err());
}

pub fn amount(numer: i64, denom: i64) -> BigRational {
    BigRational::new(BigInt::from(numer), BigInt::from(denom))
}

pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}
