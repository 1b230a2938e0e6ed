// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, bail};

use crate::{NewAccount, UserRole};

pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormFieldSpec {
    pub label: &'static str,
    pub required: bool,
    pub secret: bool,
}

const fn field(label: &'static str, required: bool, secret: bool) -> FormFieldSpec {
    FormFieldSpec {
        label,
        required,
        secret,
    }
}

pub const LOGIN_FIELDS: [FormFieldSpec; 2] = [
    field("username", true, false),
    field("password", true, true),
];

pub const REGISTER_FIELDS: [FormFieldSpec; 5] = [
    field("username", true, false),
    field("email", true, false),
    field("full name", false, false),
    field("password", true, true),
    field("confirm password", true, true),
];

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

impl LoginForm {
    pub fn validate(&self) -> Result<()> {
        if self.username.trim().is_empty() || self.password.is_empty() {
            bail!("please fill in every field");
        }
        Ok(())
    }

    pub fn field(&self, index: usize) -> Option<&str> {
        match index {
            0 => Some(&self.username),
            1 => Some(&self.password),
            _ => None,
        }
    }

    pub fn field_mut(&mut self, index: usize) -> Option<&mut String> {
        match index {
            0 => Some(&mut self.username),
            1 => Some(&mut self.password),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RegisterForm {
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub password: String,
    pub confirm_password: String,
}

impl RegisterForm {
    pub fn validate(&self) -> Result<()> {
        if self.username.trim().is_empty()
            || self.email.trim().is_empty()
            || self.password.is_empty()
        {
            bail!("please fill in every required field (username, email, password)");
        }
        if self.password != self.confirm_password {
            bail!("passwords do not match -- retype the confirmation");
        }
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            bail!("password must be at least {MIN_PASSWORD_LEN} characters");
        }
        Ok(())
    }

    /// The registration payload; the confirmation never leaves the client.
    pub fn to_account(&self) -> Result<NewAccount> {
        self.validate()?;
        let full_name = self.full_name.trim();
        Ok(NewAccount {
            username: self.username.trim().to_owned(),
            email: self.email.trim().to_owned(),
            password: self.password.clone(),
            full_name: (!full_name.is_empty()).then(|| full_name.to_owned()),
            role: UserRole::User,
        })
    }

    /// Credentials for the automatic login that follows a registration.
    pub fn login_form(&self) -> LoginForm {
        LoginForm {
            username: self.username.trim().to_owned(),
            password: self.password.clone(),
        }
    }

    pub fn field(&self, index: usize) -> Option<&str> {
        match index {
            0 => Some(&self.username),
            1 => Some(&self.email),
            2 => Some(&self.full_name),
            3 => Some(&self.password),
            4 => Some(&self.confirm_password),
            _ => None,
        }
    }

    pub fn field_mut(&mut self, index: usize) -> Option<&mut String> {
        match index {
            0 => Some(&mut self.username),
            1 => Some(&mut self.email),
            2 => Some(&mut self.full_name),
            3 => Some(&mut self.password),
            4 => Some(&mut self.confirm_password),
            _ => None,
        }
    }
}
