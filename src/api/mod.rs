//! API 路由模块
//!
//! # 结构
//!
//! - [`health`] - 健康检查
//! - [`oauth`] - Google OAuth 登录
//! - [`upload`] - 商品图片上传接口
//! - [`categories`] - 分类管理接口
//! - [`products`] - 商品管理接口
//! - [`members`] - 会员管理接口
//! - [`orders`] - 订单管理接口

pub mod health;
pub mod oauth;
pub mod upload;

// Data models API
pub mod categories;
pub mod members;
pub mod orders;
pub mod products;
