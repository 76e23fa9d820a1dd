//! Resource implementations for console types.

use crate::cache::{Resource, ResourceKind};

use super::types::{Detection, Media, Model, Operation, User};

impl Resource for Media {
  const KIND: ResourceKind = ResourceKind::Media;
}

impl Resource for Model {
  const KIND: ResourceKind = ResourceKind::Model;
}

impl Resource for Detection {
  const KIND: ResourceKind = ResourceKind::Detection;
}

impl Resource for User {
  const KIND: ResourceKind = ResourceKind::User;
}

impl Resource for Operation {
  const KIND: ResourceKind = ResourceKind::Operation;
}
