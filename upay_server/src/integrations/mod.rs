pub mod merchant_notify;
