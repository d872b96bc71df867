use crate::catalog::{Book, CatalogError};
use tracing::{debug, error};

/// 생성 후처리 단계에 전달되는 생성 정보
#[derive(Debug, Clone, Copy)]
pub struct Created<'a> {
    pub book: &'a Book,

    /// 도서를 등록한 사용자
    pub acting_user: Option<u64>,
}

/// 도서가 처음 저장된 직후 한번 실행되는 후처리 단계
pub trait AfterCreate {

    fn name(&self) -> &'static str;

    fn after_create(&self, created: &Created) -> Result<(), CatalogError>;
}

/// 생성 후처리 파이프라인
///
/// 등록된 순서대로 단계를 실행하며 한 단계가 실패하면 이후 단계는 실행하지 않는다.
/// 도서 저장은 파이프라인 실행 전에 이미 끝난 상태로 실패하더라도 되돌리지 않는다.
pub struct Pipeline {
    steps: Vec<Box<dyn AfterCreate>>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self { steps: Vec::new() }
    }

    pub fn add_step(&mut self, step: Box<dyn AfterCreate>) {
        self.steps.push(step);
    }

    pub fn step_names(&self) -> Vec<&'static str> {
        self.steps.iter().map(|s| s.name()).collect()
    }

    pub fn run(&self, created: &Created) -> Result<(), CatalogError> {
        for step in &self.steps {
            debug!("{} 후처리 시작 (grandham_id: {})", step.name(), created.book.grandham_id());

            if let Err(cause) = step.after_create(created) {
                error!("{} 후처리 중 에러가 발생 하였습니다. 도서는 저장된 상태로 남습니다. => {} (grandham_id: {})",
                    step.name(), cause, created.book.grandham_id());
                return Err(CatalogError::PostCreateFailed {
                    grandham_id: created.book.grandham_id().to_string(),
                    step: step.name(),
                    cause: Box::new(cause),
                });
            }
        }
        Ok(())
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::GrandhamId;
    use std::cell::RefCell;
    use std::rc::Rc;

    struct Recording {
        name: &'static str,
        fail: bool,
        calls: Rc<RefCell<Vec<&'static str>>>,
    }

    impl AfterCreate for Recording {
        fn name(&self) -> &'static str {
            self.name
        }

        fn after_create(&self, _: &Created) -> Result<(), CatalogError> {
            self.calls.borrow_mut().push(self.name);
            if self.fail {
                Err(CatalogError::NotFound("boom".to_owned()))
            } else {
                Ok(())
            }
        }
    }

    fn book() -> Book {
        Book::builder().grandham_id(GrandhamId::generate()).language_id(1).build().unwrap()
    }

    #[test]
    fn steps_run_in_order() {
        let calls = Rc::new(RefCell::new(Vec::new()));
        let mut pipeline = Pipeline::new();
        pipeline.add_step(Box::new(Recording { name: "first", fail: false, calls: calls.clone() }));
        pipeline.add_step(Box::new(Recording { name: "second", fail: false, calls: calls.clone() }));

        let book = book();
        pipeline.run(&Created { book: &book, acting_user: None }).unwrap();

        assert_eq!(*calls.borrow(), vec!["first", "second"]);
    }

    #[test]
    fn failing_step_stops_the_rest() {
        let calls = Rc::new(RefCell::new(Vec::new()));
        let mut pipeline = Pipeline::new();
        pipeline.add_step(Box::new(Recording { name: "first", fail: true, calls: calls.clone() }));
        pipeline.add_step(Box::new(Recording { name: "second", fail: false, calls: calls.clone() }));

        let book = book();
        let result = pipeline.run(&Created { book: &book, acting_user: None });

        assert_eq!(*calls.borrow(), vec!["first"]);
        match result {
            Err(CatalogError::PostCreateFailed { grandham_id, step, .. }) => {
                assert_eq!(grandham_id, book.grandham_id().to_string());
                assert_eq!(step, "first");
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
