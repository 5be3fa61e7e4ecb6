pub mod department;
pub mod employee;

pub use department::{
    DeleteDepartment, DeleteMode, DeletionSummary, Department, DepartmentNode, DepartmentUpdate,
    NewDepartment, TreeQuery,
};
pub use employee::{Employee, EmployeeSort, NewEmployee};
